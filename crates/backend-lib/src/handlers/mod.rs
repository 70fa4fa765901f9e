// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Every response uses the `Envelope` shape.

pub mod auth;
pub mod users;

use accounts_common::Envelope;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    Json,
};

use crate::error::AppError;

/// JSON body extractor that rejects with an [`AppError`] envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query-string extractor that rejects with an [`AppError`] envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Handler response: status code plus envelope
pub type ApiResponse<T> = Result<(StatusCode, Json<Envelope<T>>), AppError>;

pub(crate) fn respond<T>(status: StatusCode, envelope: Envelope<T>) -> ApiResponse<T> {
    Ok((status, Json(envelope)))
}

/// `GET /`
pub async fn welcome() -> Json<Envelope<()>> {
    Json(Envelope::ok(StatusCode::OK.as_u16(), "Welcome to the accounts service"))
}
