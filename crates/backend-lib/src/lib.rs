// ============================
// accounts backend-lib/src/lib.rs
// ============================
//! Core library for the accounts backend: password policy, session tokens,
//! verification codes and the HTTP surface over them.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod metrics;
pub mod router;
pub mod storage;
pub mod validation;
pub mod verification;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::auth::{AuthGateway, TokenManager};
use crate::clock::Clock;
use crate::config::Settings;
use crate::mail::Mailer;
use crate::storage::UserStore;
use crate::verification::{CodeCache, VerificationCodes};

pub use router::create_router;

/// Application state shared across all handlers
pub struct AppState {
    /// Account operations
    pub gateway: Arc<AuthGateway>,
}

impl AppState {
    /// Wire the engines over the given collaborators
    pub fn new(
        settings: &Settings,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn CodeCache>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let secret = settings.signing_key().context("cannot issue session tokens")?;
        let tokens = Arc::new(TokenManager::new(secret, clock.clone())?);

        let code_ttl = i64::try_from(settings.code_ttl_secs).context("code_ttl_secs out of range")?;
        let codes = Arc::new(
            VerificationCodes::new(cache, mailer, clock)
                .with_ttl(chrono::Duration::seconds(code_ttl))
                .with_mail_timeout(Duration::from_secs(settings.mail.timeout_secs))
                .with_sender_name(settings.mail.from_name.clone()),
        );

        let gateway = Arc::new(
            AuthGateway::new(store, tokens, codes).with_session_ttl(settings.token_ttl_minutes),
        );

        Ok(Self { gateway })
    }
}
