// ============================
// backend-lib/src/mail.rs
// ============================
//! Outbound mail. The verification-code engine only sees the [`Mailer`] trait.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{MailSettings, MailTransport};

/// Mail dispatch failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("mail dispatch failed: {0}")]
    Dispatch(String),

    #[error("mail dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends a single plain-text message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// `lettre`-backed mailer over SMTP or, for development, a spool directory
pub struct LettreMailer {
    transport: Transport,
    from: Mailbox,
}

impl LettreMailer {
    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, MailError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("{to}: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = self.build_message(to, subject, body)?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| MailError::Dispatch(format!("smtp: {e}")))?;
            }
            Transport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| MailError::Dispatch(format!("file: {e}")))?;
            }
        }

        Ok(())
    }
}

/// Mailer that only records the dispatch in the log. Never logs the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        info!(to, subject, "mail dispatched to log transport");
        Ok(())
    }
}

/// Build the mailer described by `settings`
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    let from = format!("{} <{}>", settings.from_name, settings.from_email)
        .parse::<Mailbox>()
        .map_err(|e| MailError::Address(format!("from address: {e}")))?;

    let transport = match &settings.transport {
        MailTransport::Smtp {
            host,
            port,
            username,
            password,
            use_tls,
        } => {
            if !use_tls {
                warn!("SMTP TLS is disabled - this is not recommended for production");
            }

            let builder = if *use_tls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| MailError::Dispatch(format!("create SMTP transport: {e}")))?
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            };

            let smtp = builder
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()))
                .timeout(Some(Duration::from_secs(settings.timeout_secs)))
                .build();
            Transport::Smtp(smtp)
        }
        MailTransport::File { path } => {
            std::fs::create_dir_all(path)
                .map_err(|e| MailError::Dispatch(format!("create mail spool directory: {e}")))?;
            Transport::File(AsyncFileTransport::<Tokio1Executor>::new(path))
        }
        MailTransport::Log => return Ok(Arc::new(LogMailer)),
    };

    Ok(Arc::new(LettreMailer { transport, from }))
}
