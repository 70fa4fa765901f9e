// ============================
// crates/backend-lib/src/handlers/users.rs
// ============================
//! Account handlers under `/users`.
use std::sync::Arc;

use accounts_common::{
    CodeSentResponse, DeleteUserRequest, EmailQuery, Envelope, UpdatePasswordRequest, UpdateUserRequest,
    UserResponse, VerifyCodeRequest,
};
use axum::{extract::State, http::StatusCode};
use tracing::warn;

use super::{respond, ApiResponse, AppJson, AppQuery};
use crate::auth::AuthUser;
use crate::AppState;

/// `GET /users/profile`
pub async fn profile(State(state): State<Arc<AppState>>, AuthUser(identity): AuthUser) -> ApiResponse<UserResponse> {
    let user = state.gateway.profile(&identity).await?;
    respond(
        StatusCode::OK,
        Envelope::success(StatusCode::OK.as_u16(), "user fetched successfully", user.to_response(true)),
    )
}

/// `PUT /users/update`
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResponse<UserResponse> {
    let user = state.gateway.update_user(&identity, req).await?;
    respond(
        StatusCode::ACCEPTED,
        Envelope::success(StatusCode::ACCEPTED.as_u16(), "user updated successfully", user.to_response(true)),
    )
}

/// `PUT /users/update_password`
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    AppJson(req): AppJson<UpdatePasswordRequest>,
) -> ApiResponse<()> {
    state.gateway.update_password(&identity, req).await?;
    respond(
        StatusCode::ACCEPTED,
        Envelope::ok(StatusCode::ACCEPTED.as_u16(), "password updated successfully"),
    )
}

/// `DELETE /users/deactivate`
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    AppJson(req): AppJson<DeleteUserRequest>,
) -> ApiResponse<()> {
    state.gateway.delete_user(&identity, req).await?;
    respond(
        StatusCode::ACCEPTED,
        Envelope::ok(StatusCode::ACCEPTED.as_u16(), "user deactivated successfully"),
    )
}

/// `GET /users/get_email?email=`
pub async fn get_email(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<EmailQuery>,
) -> ApiResponse<UserResponse> {
    let user = state.gateway.lookup_email(&query.email).await?;
    respond(
        StatusCode::OK,
        Envelope::success(StatusCode::OK.as_u16(), "user retrieved successfully", user.to_response(false)),
    )
}

/// `GET /users/send_code_to_user?email=`
pub async fn send_code(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<EmailQuery>,
) -> ApiResponse<CodeSentResponse> {
    let (user, issued) = state.gateway.send_code(&query.email).await?;

    let delivered = issued.delivery.is_ok();
    let message = if delivered {
        "code sent to user successfully"
    } else {
        warn!(user_id = %user.id, "verification code issued but not delivered");
        "code issued but the email could not be delivered"
    };

    let data = CodeSentResponse {
        user_id: user.id,
        email: user.email,
        expires_at: issued.expires_at,
        delivered,
    };
    respond(StatusCode::OK, Envelope::success(StatusCode::OK.as_u16(), message, data))
}

/// `POST /users/verify_code`
pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyCodeRequest>,
) -> ApiResponse<()> {
    state.gateway.verify_code(req).await?;
    respond(StatusCode::OK, Envelope::ok(StatusCode::OK.as_u16(), "code verification successful"))
}
