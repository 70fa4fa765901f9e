// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use accounts_common::Status;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::password::{PasswordError, PasswordRule, PASSWORD_RULE_MESSAGES};
use crate::auth::token::TokenError;
use crate::storage::StoreError;
use crate::validation::ValidationError;
use crate::verification::CodeError;

/// Error category, independent of transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    Dependency,
    Internal,
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Carries every rule the password failed
    #[error("password Strength not met")]
    WeakPassword(Vec<PasswordRule>),

    #[error("Missing or malformed authorization header")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Invalid password. Please check your credentials and try again.")]
    InvalidCredentials,

    #[error("Access denied")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Phone number already exists")]
    DuplicatePhone,

    #[error("Duplicate key error")]
    DuplicateKey,

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_)
            | AppError::Validation(_)
            | AppError::WeakPassword(_)
            | AppError::Password(PasswordError::Empty) => ErrorKind::Validation,
            AppError::MissingToken | AppError::InvalidCredentials => ErrorKind::Authentication,
            AppError::Token(TokenError::MissingSecret | TokenError::Signing(_)) => ErrorKind::Internal,
            AppError::Token(_) => ErrorKind::Authentication,
            AppError::Forbidden => ErrorKind::Authorization,
            AppError::UserNotFound | AppError::Store(StoreError::NotFound) => ErrorKind::NotFound,
            AppError::Code(CodeError::NotFound) => ErrorKind::NotFound,
            AppError::Code(CodeError::Expired | CodeError::Mismatch) => ErrorKind::Authentication,
            AppError::Code(_) => ErrorKind::Dependency,
            AppError::DuplicateEmail
            | AppError::DuplicatePhone
            | AppError::DuplicateKey
            | AppError::Store(StoreError::Conflict { .. }) => ErrorKind::Conflict,
            AppError::Store(StoreError::Backend(_)) => ErrorKind::Dependency,
            AppError::Password(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Dependency | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) | AppError::Validation(_) => "VAL_001",
            AppError::WeakPassword(_) => "VAL_002",
            AppError::Password(PasswordError::Empty) => "VAL_003",
            AppError::MissingToken => "AUTH_001",
            // malformed and forged tokens are indistinguishable to clients
            AppError::Token(TokenError::Malformed | TokenError::InvalidSignature) => "AUTH_002",
            AppError::Token(TokenError::Expired) => "AUTH_003",
            AppError::InvalidCredentials => "AUTH_004",
            AppError::Token(_) => "INT_002",
            AppError::Forbidden => "AUTHZ_001",
            AppError::UserNotFound => "NF_001",
            AppError::Store(StoreError::NotFound) => "NF_002",
            AppError::DuplicateEmail => "CONFLICT_001",
            AppError::DuplicatePhone => "CONFLICT_002",
            AppError::DuplicateKey | AppError::Store(StoreError::Conflict { .. }) => "CONFLICT_003",
            AppError::Code(CodeError::NotFound) => "CODE_001",
            AppError::Code(CodeError::Expired) => "CODE_002",
            AppError::Code(CodeError::Mismatch) => "CODE_003",
            AppError::Code(_) => "DEP_002",
            AppError::Store(StoreError::Backend(_)) => "DEP_001",
            AppError::Password(_) => "INT_003",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show to clients
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Token(TokenError::Malformed | TokenError::InvalidSignature) => {
                "Invalid authentication token".to_string()
            }
            AppError::Token(TokenError::Expired) => "Authentication token has expired".to_string(),
            AppError::Code(CodeError::NotFound) => "Verification code not found".to_string(),
            AppError::Code(CodeError::Expired) => "Verification code has expired".to_string(),
            AppError::Store(StoreError::NotFound) => "Resource not found".to_string(),
            AppError::Store(StoreError::Conflict { .. }) => "Duplicate key error".to_string(),
            AppError::Password(PasswordError::Empty) => "Password must not be empty".to_string(),
            _ if matches!(self.kind(), ErrorKind::Dependency | ErrorKind::Internal) => {
                "An internal server error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.sanitized_message();

        if status.is_server_error() {
            // full detail stays in the log
            error!(code = error_code, error = %self, "request failed");
        }

        let mut body = json!({
            "status": Status::Error,
            "statusCode": status.as_u16(),
            "message": message,
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        if let AppError::WeakPassword(_) = &self {
            body["rules"] = json!(PASSWORD_RULE_MESSAGES);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::MissingToken.error_code(), "AUTH_001");
        assert_eq!(AppError::Token(TokenError::Expired).error_code(), "AUTH_003");
        assert_eq!(AppError::InvalidCredentials.error_code(), "AUTH_004");
        assert_eq!(AppError::Forbidden.error_code(), "AUTHZ_001");
        assert_eq!(AppError::UserNotFound.error_code(), "NF_001");
        assert_eq!(AppError::DuplicateEmail.error_code(), "CONFLICT_001");
        assert_eq!(AppError::Code(CodeError::Mismatch).error_code(), "CODE_003");
        assert_eq!(AppError::InvalidInput("test".to_string()).error_code(), "VAL_001");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::WeakPassword(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Token(TokenError::InvalidSignature).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Token(TokenError::MissingSecret).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::DuplicatePhone.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Code(CodeError::Expired).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Code(CodeError::Cache(crate::verification::CacheError::Unavailable(
                "down".into()
            )))
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Store(StoreError::Backend("db".into())).kind(),
            ErrorKind::Dependency
        );
    }

    #[test]
    fn test_sanitized_messages_hide_internals() {
        let err = AppError::Store(StoreError::Backend("connection to 10.0.0.3 refused".into()));
        assert_eq!(err.sanitized_message(), "An internal server error occurred");

        let err = AppError::Internal("stack trace".into());
        assert!(!err.sanitized_message().contains("stack trace"));

        // client errors keep their specific message
        assert_eq!(AppError::DuplicateEmail.sanitized_message(), "Email already exists");
        assert_eq!(
            AppError::Token(TokenError::InvalidSignature).sanitized_message(),
            AppError::Token(TokenError::Malformed).sanitized_message()
        );
    }

    #[tokio::test]
    async fn test_weak_password_response_lists_rules() {
        let (status, body) = body_json(AppError::WeakPassword(vec![PasswordRule::Digit])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"]["code"], "VAL_002");
        let rules = body["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0], "Password must be minimum of 8 characters");
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = body_json(AppError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");
        assert!(body.get("rules").is_none());
        assert!(body.get("data").is_none());
    }
}
