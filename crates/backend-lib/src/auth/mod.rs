// ============================
// backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod extract;
pub mod gateway;
pub mod password;
pub mod token;

pub use extract::AuthUser;
pub use gateway::{ensure_owner, parse_bearer, AuthGateway, SESSION_TTL_MINUTES};
pub use password::{
    failed_rules, hash_password, validate_password_strength, verify_password,
    verify_password_secure, PasswordError, PasswordRule,
    MIN_PASSWORD_LENGTH, PASSWORD_RULE_MESSAGES,
};
pub use token::{Identity, TokenError, TokenManager, STANDARD_ROLE};
