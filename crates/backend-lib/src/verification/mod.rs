// ============================
// backend-lib/src/verification/mod.rs
// ============================
//! One-time verification codes.
//!
//! Per subject the lifecycle is `NONE -> PENDING -> (CONSUMED | EXPIRED) -> NONE`.
//! At most one challenge is pending per subject; a new request overwrites the
//! previous one. Expiry is enforced lazily at lookup time against the stored
//! `expires_at`, not by a sweeper. A wrong code leaves the challenge in place
//! so the user may retry until it expires.

pub mod cache;

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::mail::{MailError, Mailer};
use crate::metrics::{CODE_ISSUED, CODE_REJECTED, CODE_VERIFIED, MAIL_FAILED};

pub use cache::{CacheError, CodeCache, MemoryCodeCache};

/// Lifetime of a pending challenge (10 minutes)
pub const DEFAULT_CODE_TTL_SECS: u64 = 10 * 60;

/// Upper bound on a single mail dispatch
pub const DEFAULT_MAIL_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Codes are drawn uniformly from this inclusive range
pub const CODE_RANGE: std::ops::RangeInclusive<u32> = 1000..=9999;

/// Subject line of the verification mail
pub const MAIL_SUBJECT: &str = "Verification Code";

/// Pending challenge as stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Challenge {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Verification failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Never requested, already consumed, or evicted by the cache
    #[error("no verification code is pending for this user")]
    NotFound,

    #[error("code expired")]
    Expired,

    #[error("Invalid verification code")]
    Mismatch,

    #[error("verification cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error("unreadable challenge record: {0}")]
    Corrupt(String),
}

/// Result of a code request
#[derive(Debug)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// The code is live even when this is an error
    pub delivery: Result<(), MailError>,
}

/// Draw a 4-digit code from a generator seeded with the current time
fn generate_code() -> String {
    let seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let mut rng = StdRng::seed_from_u64(seed);
    format!("{:04}", rng.random_range(CODE_RANGE))
}

fn compose_body(address: &str, code: &str, ttl: Duration, sender_name: &str) -> String {
    format!(
        "Hi {address},\n\n\
         We've received your request for a single-use code to use with your {sender_name} account.\n\n\
         Your verification code is: {code}\n\n\
         The code expires in {minutes} minutes. If you didn't request this code, you can safely ignore this email. \
         Someone else might have typed your email address by mistake.\n\n\
         Thanks,\nThe {sender_name} account team\n",
        minutes = ttl.num_minutes(),
    )
}

/// Issues, stores, mails and redeems verification codes
pub struct VerificationCodes {
    cache: Arc<dyn CodeCache>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    mail_timeout: StdDuration,
    sender_name: String,
}

impl VerificationCodes {
    pub fn new(cache: Arc<dyn CodeCache>, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            mailer,
            clock,
            ttl: Duration::seconds(DEFAULT_CODE_TTL_SECS as i64),
            mail_timeout: DEFAULT_MAIL_TIMEOUT,
            sender_name: "Accounts".to_string(),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_mail_timeout(mut self, timeout: StdDuration) -> Self {
        self.mail_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a code for `subject_id`, store it and mail it to `delivery_address`.
    ///
    /// The cache write and the mail dispatch run concurrently. A failed cache
    /// write fails the request; a failed dispatch is reported in
    /// [`IssuedCode::delivery`] and the stored code stays redeemable.
    #[instrument(skip(self, delivery_address), fields(subject = %subject_id))]
    pub async fn request_code(&self, subject_id: &str, delivery_address: &str) -> Result<IssuedCode, CodeError> {
        let code = generate_code();
        let expires_at = self.clock.now() + self.ttl;

        let record = serde_json::to_string(&Challenge {
            code: code.clone(),
            expires_at,
        })
        .map_err(|e| CodeError::Corrupt(e.to_string()))?;
        let cache_ttl = self.ttl.to_std().unwrap_or(StdDuration::ZERO);
        let body = compose_body(delivery_address, &code, self.ttl, &self.sender_name);

        let store = self.cache.set(subject_id, record, cache_ttl);
        let dispatch = async {
            tokio::time::timeout(self.mail_timeout, self.mailer.send(delivery_address, MAIL_SUBJECT, &body))
                .await
                .unwrap_or(Err(MailError::Timeout(self.mail_timeout)))
        };
        let (stored, delivery) = tokio::join!(store, dispatch);
        stored?;

        counter!(CODE_ISSUED).increment(1);
        match &delivery {
            Ok(()) => info!("verification code issued and mailed"),
            Err(e) => {
                counter!(MAIL_FAILED).increment(1);
                warn!(error = %e, "verification code stored but mail dispatch failed");
            }
        }

        Ok(IssuedCode {
            code,
            expires_at,
            delivery,
        })
    }

    /// Redeem `submitted` against the pending challenge of `subject_id`.
    ///
    /// Success consumes the challenge. A mismatch keeps it for another attempt.
    #[instrument(skip(self, submitted), fields(subject = %subject_id))]
    pub async fn verify_code(&self, subject_id: &str, submitted: &str) -> Result<(), CodeError> {
        let Some(raw) = self.cache.get(subject_id).await? else {
            counter!(CODE_REJECTED).increment(1);
            return Err(CodeError::NotFound);
        };
        let challenge: Challenge = serde_json::from_str(&raw).map_err(|e| CodeError::Corrupt(e.to_string()))?;

        if self.clock.now() >= challenge.expires_at {
            counter!(CODE_REJECTED).increment(1);
            if let Err(e) = self.cache.delete_if(subject_id, &raw).await {
                warn!(error = %e, "could not remove expired challenge");
            }
            return Err(CodeError::Expired);
        }

        if submitted != challenge.code {
            counter!(CODE_REJECTED).increment(1);
            return Err(CodeError::Mismatch);
        }

        // only the request that removes this exact challenge wins; a replacement
        // written since the read is left alone
        if !self.cache.delete_if(subject_id, &raw).await? {
            counter!(CODE_REJECTED).increment(1);
            return Err(CodeError::NotFound);
        }

        counter!(CODE_VERIFIED).increment(1);
        info!("verification code redeemed");
        Ok(())
    }
}
