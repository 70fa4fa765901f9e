// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{self, auth, users};
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/profile", get(users::profile))
        .route("/update", put(users::update))
        .route("/update_password", put(users::update_password))
        .route("/deactivate", delete(users::deactivate))
        .route("/get_email", get(users::get_email))
        .route("/send_code_to_user", get(users::send_code))
        .route("/verify_code", post(users::verify_code));

    Router::new()
        .route("/", get(handlers::welcome))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
