// ============================
// accounts-backend-bin/src/main.rs
// ============================
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use backend_lib::{
    clock::SystemClock,
    config::{LogFormat, Settings},
    create_router,
    mail::mailer_from_settings,
    storage::MemoryUserStore,
    verification::MemoryCodeCache,
    AppState,
};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often evicted verification codes are swept from memory
const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "accounts-server", about = "User account backend")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "ACCOUNTS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("invalid configuration")?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    init_tracing(&settings);

    let mailer = mailer_from_settings(&settings.mail).context("cannot set up mail transport")?;
    let cache = MemoryCodeCache::new();
    let _janitor = cache.spawn_janitor(JANITOR_INTERVAL);

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::new(
        &settings,
        Arc::new(MemoryUserStore::new()),
        Arc::new(cache),
        mailer,
        Arc::new(SystemClock),
    )?);

    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await.with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
