//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store reachable)
//!
//! # Registration and login (rate limited per IP)
//! POST   /auth/otp/send                   - Validate signup form, email a code
//! POST   /auth/otp/verify                 - Check the code
//! POST   /auth/register/complete          - Contact details, queue for approval
//! POST   /auth/login                      - Username/password login
//!
//! # Admin (Bearer token, Admin role)
//! GET    /admin/approvals                 - Pending registrations
//! POST   /admin/approvals/{key}/accept    - Move into the role partition
//! POST   /admin/approvals/{key}/reject    - Discard
//! GET    /admin/accounts                  - Approved accounts (?role=)
//! DELETE /admin/accounts/{role}/{key}     - Remove an account
//! ```

pub mod admin;
pub mod auth;
pub mod health;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest},
    http::Uri,
    middleware,
    routing::{delete, get, post},
};

use crate::error::AppError;
use crate::middleware::{RateLimiterLayer, rate_limited_json};
use crate::state::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// JSON body extractor whose rejections use the JSON error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Registration and login routes, rate limited when a limiter is given.
pub fn auth_routes(rate_limit: Option<RateLimiterLayer>) -> Router<AppState> {
    let router = Router::new()
        .route("/otp/send", post(auth::send_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/register/complete", post(auth::complete_registration))
        .route("/login", post(auth::login));

    match rate_limit {
        Some(layer) => router
            .layer(layer)
            .layer(middleware::map_response(rate_limited_json)),
        None => router,
    }
}

/// Admin routes. Every handler requires an Admin session.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(admin::list_approvals))
        .route("/approvals/{key}/accept", post(admin::accept_approval))
        .route("/approvals/{key}/reject", post(admin::reject_approval))
        .route("/accounts", get(admin::list_accounts))
        .route("/accounts/{role}/{key}", delete(admin::remove_account))
}

/// Build all application routes.
pub fn routes(rate_limit: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes(rate_limit))
        .nest("/admin", admin_routes())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
