//! Registration error types.

use thiserror::Error;

use salon_core::OtpCodeError;

use crate::db::StoreError;
use crate::services::email::NotificationError;
use crate::services::password::{PasswordHashError, ValidationError};
use crate::services::token::TokenError;

/// Errors that can occur while moving a registration through its states.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Rejected input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The username already belongs to an account.
    #[error("Username is already taken")]
    UsernameTaken,

    /// No pending registration for this email.
    #[error("No registration request found for this email. Please request a new OTP")]
    NoSuchRequest,

    /// The OTP's validity window has passed.
    #[error("OTP has expired. Please request a new one")]
    Expired,

    /// The submitted code is not the issued one.
    #[error("Invalid OTP")]
    CodeMismatch,

    /// Completion attempted before the OTP was verified.
    #[error("Please verify your email first")]
    NotVerified,

    /// Password hashing failed.
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),

    /// OTP generation failed.
    #[error("OTP generation failed: {0}")]
    CodeGeneration(#[from] OtpCodeError),

    /// Session token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The code was stored but could not be delivered.
    #[error("OTP delivery failed: {0}")]
    Notification(#[from] NotificationError),
}
