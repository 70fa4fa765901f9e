// ============================
// backend-lib/src/auth/password.rs
// ============================
//! Password strength policy, hashing and verification.
use rand::Rng;
use scrypt::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use thiserror::Error;
use zeroize::Zeroize;

/// Minimum password length, counted in Unicode code points
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// scrypt cost parameters. Fixed for the whole deployment; digests carry
/// their own parameters so raising these later keeps old hashes verifiable.
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_OUTPUT_LEN: usize = 32;
const SALT_LEN: usize = 16;

/// Human readable rule list surfaced whenever a password is rejected
pub const PASSWORD_RULE_MESSAGES: [&str; 5] = [
    "Password must be minimum of 8 characters",
    "Password must contain at least a number",
    "Password must contain at least a symbol",
    "Password must contain an upper case letter",
    "Password must contain a lower case letter",
];

/// A single strength rule. Machine readable counterpart of [`PASSWORD_RULE_MESSAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Digit,
    Symbol,
    Uppercase,
    Lowercase,
}

impl PasswordRule {
    pub const ALL: [PasswordRule; 5] = [
        PasswordRule::MinLength,
        PasswordRule::Digit,
        PasswordRule::Symbol,
        PasswordRule::Uppercase,
        PasswordRule::Lowercase,
    ];

    /// Stable identifier, safe to match on in clients
    pub fn id(self) -> &'static str {
        match self {
            PasswordRule::MinLength => "min_length",
            PasswordRule::Digit => "digit",
            PasswordRule::Symbol => "symbol",
            PasswordRule::Uppercase => "uppercase",
            PasswordRule::Lowercase => "lowercase",
        }
    }

    pub fn description(self) -> &'static str {
        PASSWORD_RULE_MESSAGES[self as usize]
    }

    fn holds(self, password: &str) -> bool {
        match self {
            PasswordRule::MinLength => password.chars().count() >= MIN_PASSWORD_LENGTH,
            PasswordRule::Digit => password.chars().any(char::is_numeric),
            PasswordRule::Symbol => password.chars().any(is_symbol),
            PasswordRule::Uppercase => password.chars().any(char::is_uppercase),
            PasswordRule::Lowercase => password.chars().any(char::is_lowercase),
        }
    }
}

/// Punctuation or symbol: anything printable that is neither a letter nor a number
fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()
}

/// Errors raised while hashing or verifying credentials
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("malformed password digest: {0}")]
    MalformedDigest(String),

    #[error("could not hash password: {0}")]
    Hash(String),
}

/// Every rule the password breaks, in the order of [`PASSWORD_RULE_MESSAGES`]
pub fn failed_rules(password: &str) -> Vec<PasswordRule> {
    PasswordRule::ALL
        .into_iter()
        .filter(|rule| !rule.holds(password))
        .collect()
}

/// Check if a password meets the strength policy
pub fn validate_password_strength(password: &str) -> bool {
    PasswordRule::ALL.into_iter().all(|rule| rule.holds(password))
}

/// Hash a password using scrypt
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.is_empty() {
        return Err(PasswordError::Empty);
    }

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, SCRYPT_OUTPUT_LEN)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a digest.
///
/// A wrong password is `Ok(false)`; only an unparsable digest is an error.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(digest).map_err(|e| PasswordError::MalformedDigest(e.to_string()))?;
    match Scrypt.verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::MalformedDigest(e.to_string())),
    }
}

/// Securely hash a password and zeroize the original
pub fn hash_password_secure(plain: &mut String) -> Result<String, PasswordError> {
    let hash = hash_password(plain);
    plain.zeroize();
    hash
}

/// Verify a password and zeroize the original
pub fn verify_password_secure(plain: &mut String, digest: &str) -> Result<bool, PasswordError> {
    let verified = verify_password(plain, digest);
    plain.zeroize();
    verified
}
