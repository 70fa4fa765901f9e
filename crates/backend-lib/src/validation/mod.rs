// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request field validation.

pub mod image;

use std::sync::LazyLock;

use accounts_common::{RegisterRequest, UpdateUserRequest};
use regex::Regex;
use thiserror::Error;

pub use image::{probe_image_urls, ImageProbe, MAX_IMAGE_BYTES};

// Common validation constants
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_NAME_LENGTH: usize = 100;
pub const PHONE_LENGTH: usize = 11;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid phone: must be exactly {PHONE_LENGTH} characters")]
    InvalidPhone,
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reject empty or whitespace-only values
pub fn validate_required<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(trimmed)
}

/// Validate an email and return its canonical (trimmed, lower-cased) form
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email must be at most {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail("Invalid email format".to_string()));
    }

    Ok(email.to_lowercase())
}

/// Phone numbers are exactly eleven characters
pub fn validate_phone(phone: &str) -> ValidationResult<&str> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::Required("phone"));
    }
    if phone.chars().count() != PHONE_LENGTH {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(phone)
}

/// Format checks for a registration. Password strength is checked separately.
pub fn validate_registration(req: &RegisterRequest) -> ValidationResult<()> {
    validate_required("lastname", &req.lastname)?;
    validate_required("firstname", &req.firstname)?;
    validate_email(&req.email)?;
    validate_phone(&req.phone)?;
    validate_required("address", &req.address)?;
    if req.password.is_empty() {
        return Err(ValidationError::Required("password"));
    }
    Ok(())
}

/// Format checks for a contact update
pub fn validate_update(req: &UpdateUserRequest) -> ValidationResult<()> {
    validate_required("id", &req.id)?;
    validate_email(&req.email)?;
    validate_phone(&req.phone)?;
    validate_required("address", &req.address)?;
    Ok(())
}
