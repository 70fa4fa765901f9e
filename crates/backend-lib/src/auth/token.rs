// ============================
// backend-lib/src/auth/token.rs
// ============================
//! Signed, self-contained session tokens (JWT, HS256).
//!
//! There is no server-side session table: a token stays valid until its `exp`
//! claim passes. Revoking a token early requires rotating the signing secret,
//! which invalidates every outstanding token at once.
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;

/// Role carried by every token issued at login
pub const STANDARD_ROLE: &str = "standard";

/// The only accepted signing scheme
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,  // Subject (user ID)
    pub role: String, // Role name
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
    pub jti: String,  // Token ID
}

/// Identity asserted by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub role: String,
}

/// Token failures. Callers rely on telling these apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid authentication token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("could not sign token: {0}")]
    Signing(String),
}

/// Issues and verifies session tokens with one process-wide secret.
///
/// Built once at startup and shared by handle.
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // expiry is checked against `clock` after decoding
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    /// Create a signed token for `subject_id` that expires `ttl_minutes` from now
    pub fn issue_token(&self, subject_id: &str, role: &str, ttl_minutes: u32) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = SessionClaims {
            sub: subject_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(i64::from(ttl_minutes))).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return the identity it asserts
    pub fn verify_token(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                // structure, encoding, foreign algorithms, missing claims
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(Identity {
            subject_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};

    const SECRET: &str = "test-secret-key-for-jwt";

    fn manager() -> TokenManager {
        TokenManager::new(SECRET, Arc::new(SystemClock)).unwrap()
    }

    /// Replace one character of the given segment with a different base64url character
    fn tamper(token: &str, segment: usize) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let seg = &mut parts[segment];
        let mid = seg.len() / 2;
        let replacement = if &seg[mid..=mid] == "A" { "B" } else { "A" };
        seg.replace_range(mid..=mid, replacement);
        parts.join(".")
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tm = manager();
        let token = tm.issue_token("user-1", STANDARD_ROLE, 30).unwrap();
        assert!(!token.is_empty());

        let identity = tm.verify_token(&token).unwrap();
        assert_eq!(identity.subject_id, "user-1");
        assert_eq!(identity.role, STANDARD_ROLE);
    }

    #[test]
    fn test_expired_after_ttl_elapses() {
        let clock = Arc::new(ManualClock::starting_now());
        let tm = TokenManager::new(SECRET, clock.clone()).unwrap();
        let token = tm.issue_token("user-1", STANDARD_ROLE, 30).unwrap();

        clock.advance(Duration::minutes(29));
        assert!(tm.verify_token(&token).is_ok());

        clock.advance(Duration::minutes(2));
        assert_eq!(tm.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_altered_payload_or_signature_is_rejected() {
        let tm = manager();
        let token = tm.issue_token("user-1", STANDARD_ROLE, 30).unwrap();

        assert_eq!(tm.verify_token(&tamper(&token, 1)), Err(TokenError::InvalidSignature));
        assert_eq!(tm.verify_token(&tamper(&token, 2)), Err(TokenError::InvalidSignature));

        // the header is decoded before the signature is checked, so a flipped
        // header byte fails as unreadable rather than as a bad signature
        assert_eq!(tm.verify_token(&tamper(&token, 0)), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = manager().issue_token("user-1", STANDARD_ROLE, 30).unwrap();
        let other = TokenManager::new("different-secret", Arc::new(SystemClock)).unwrap();
        assert_eq!(other.verify_token(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_foreign_algorithm_is_malformed() {
        let now = chrono::Utc::now();
        let claims = SessionClaims {
            sub: "user-1".into(),
            role: STANDARD_ROLE.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(30)).timestamp(),
            jti: "jti".into(),
        };
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(manager().verify_token(&hs512), Err(TokenError::Malformed));

        // {"alg":"none","typ":"JWT"} with the payload of a genuine token and no signature
        let genuine = manager().issue_token("user-1", STANDARD_ROLE, 30).unwrap();
        let payload = genuine.split('.').nth(1).unwrap();
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{payload}.");
        assert_eq!(manager().verify_token(&unsigned), Err(TokenError::Malformed));
    }

    #[test]
    fn test_verify_malformed_token() {
        let tm = manager();
        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            assert_eq!(
                tm.verify_token(token),
                Err(TokenError::Malformed),
                "Expected Malformed for token: {token}"
            );
        }
    }

    #[test]
    fn test_missing_secret_is_refused() {
        assert!(matches!(
            TokenManager::new("  ", Arc::new(SystemClock)),
            Err(TokenError::MissingSecret)
        ));
    }
}
