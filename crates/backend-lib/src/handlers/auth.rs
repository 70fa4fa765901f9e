// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Registration and login.
use std::sync::Arc;

use accounts_common::{Envelope, LoginRequest, RegisterRequest, UserResponse};
use axum::{extract::State, http::StatusCode};

use super::{respond, ApiResponse, AppJson};
use crate::AppState;

/// `POST /auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResponse<UserResponse> {
    let user = state.gateway.register(req).await?;
    respond(
        StatusCode::CREATED,
        Envelope::success(StatusCode::CREATED.as_u16(), "user created successfully", user.to_response(false)),
    )
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResponse<UserResponse> {
    let (user, token) = state.gateway.login(req).await?;
    respond(
        StatusCode::OK,
        Envelope::success(StatusCode::OK.as_u16(), "login successful", user.to_response(true)).with_token(token),
    )
}
