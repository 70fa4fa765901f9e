// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between account clients and the server.
//! This module defines the HTTP request bodies, the public user projection
//! and the response envelope every endpoint answers with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub lastname: String,
    pub firstname: String,
    pub email: String,
    /// Exactly 11 characters
    pub phone: String,
    pub address: String,
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `PUT /users/update`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateUserRequest {
    /// Target user, must match the token subject
    pub id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Body of `PUT /users/update_password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdatePasswordRequest {
    /// Target user, must match the token subject
    pub id: String,
    pub password: String,
}

/// Body of `DELETE /users/deactivate`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteUserRequest {
    pub id: String,
}

/// Body of `POST /users/verify_code`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyCodeRequest {
    pub user_id: String,
    pub code: String,
}

/// Query of `GET /users/get_email` and `GET /users/send_code_to_user`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

/// Public projection of a stored user; never carries the password hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub lastname: String,
    pub firstname: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    #[serde(rename = "isLoggedIn")]
    pub is_logged_in: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload returned after a verification code was issued
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CodeSentResponse {
    pub user_id: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    /// `false` when the code is stored but the email could not be dispatched
    pub delivered: bool,
}

/// Outcome marker carried by every response
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Response envelope
/// # Fields
/// * `status` - success or error
/// * `status_code` - HTTP status mirrored in the body
/// * `message` - human readable outcome
/// * `data` - payload, present on success
/// * `token` - session token, present on login only
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`
    pub fn success(status_code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            status: Status::Success,
            status_code,
            message: message.into(),
            data: Some(data),
            token: None,
        }
    }

    /// Attach a session token
    #[must_use]
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl Envelope<()> {
    /// Successful response without payload
    pub fn ok(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            status_code,
            message: message.into(),
            data: None,
            token: None,
        }
    }
}
