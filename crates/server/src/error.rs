//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error response has the same JSON shape:
//!
//! ```json
//! {"status": "fail", "code": "CODE_MISMATCH", "message": "Invalid OTP"}
//! ```
//!
//! `status` is `"fail"` for client errors and `"error"` for server errors.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::{AuthError, RegistrationError, TokenError, ValidationError};

const INTERNAL_MESSAGE: &str = "Internal server error";
const STORE_MESSAGE: &str = "The account store is temporarily unavailable. Please try again later";
const NOTIFICATION_MESSAGE: &str =
    "Could not send the OTP email. The pending record still exists, request a new code";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Registration state machine failed.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Store operation failed outside a service.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route for this path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => Self::Internal(err.to_string()),
            TokenError::Expired | TokenError::Invalid(_) => Self::Unauthorized(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Status code, machine code and client-facing message.
    ///
    /// Infrastructure failures get generic messages; their details only go
    /// to the log and Sentry.
    #[must_use]
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Registration(err) => registration_parts(err),
            Self::Auth(err) => match err {
                AuthError::Validation(e) => validation_parts(e),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    err.to_string(),
                ),
                AuthError::Token(_) => internal_parts(),
                AuthError::Store(e) => store_parts(e),
            },
            Self::Store(err) => store_parts(err),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Self::NotFound(path) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Can't find {path} on this server!"),
            ),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests. Please try again later".to_string(),
            ),
            Self::Internal(_) => internal_parts(),
        }
    }
}

fn registration_parts(err: &RegistrationError) -> (StatusCode, &'static str, String) {
    let bad_request = |code| (StatusCode::BAD_REQUEST, code, err.to_string());
    match err {
        RegistrationError::Validation(e) => validation_parts(e),
        RegistrationError::UsernameTaken => bad_request("USERNAME_TAKEN"),
        RegistrationError::NoSuchRequest => bad_request("NO_SUCH_REQUEST"),
        RegistrationError::Expired => bad_request("OTP_EXPIRED"),
        RegistrationError::CodeMismatch => bad_request("CODE_MISMATCH"),
        RegistrationError::NotVerified => bad_request("NOT_VERIFIED"),
        RegistrationError::Notification(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "NOTIFICATION_FAILURE",
            NOTIFICATION_MESSAGE.to_string(),
        ),
        RegistrationError::Store(e) => store_parts(e),
        RegistrationError::PasswordHash(_)
        | RegistrationError::CodeGeneration(_)
        | RegistrationError::Token(_) => internal_parts(),
    }
}

fn validation_parts(err: &ValidationError) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
}

fn store_parts(err: &StoreError) -> (StatusCode, &'static str, String) {
    if err.is_outage() {
        (
            StatusCode::BAD_GATEWAY,
            "STORE_UNAVAILABLE",
            STORE_MESSAGE.to_string(),
        )
    } else {
        internal_parts()
    }
}

fn internal_parts() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                code = code,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code = code, "Request rejected");
        }

        let body = ErrorBody {
            status: if status.is_server_error() { "error" } else { "fail" },
            code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a session.
///
/// Call this after a bearer token is accepted to associate errors with users.
pub fn set_sentry_user(username: &str, role: &str) {
    sentry::configure_scope(|scope| {
        let mut user = sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        };
        user.other
            .insert("role".to_string(), serde_json::Value::String(role.to_string()));
        scope.set_user(Some(user));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("registration", "OTP issued", Some(&[("email", "bob@gmail.com")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
