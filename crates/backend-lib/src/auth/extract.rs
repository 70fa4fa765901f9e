// ============================
// backend-lib/src/auth/extract.rs
// ============================
//! Axum extractor resolving the caller from the `Authorization` header.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::token::Identity;
use crate::error::AppError;
use crate::AppState;

/// Authenticated caller. Rejects the request when the bearer token is
/// missing or fails verification.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        // a header that is not valid ASCII counts as absent
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        state.gateway.authorize(header).map(AuthUser)
    }
}
