//! Authentication error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::services::password::ValidationError;
use crate::services::token::TokenError;

/// Errors that can occur during login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password missing.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Session token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
