//! Business logic services.
//!
//! # Services
//!
//! - `approvals` - Admin approval queue and account management
//! - `auth` - Username/password login
//! - `email` - OTP delivery via SMTP, or to the log in development
//! - `password` - Argon2 hashing and password rules
//! - `registration` - OTP-gated registration state machine
//! - `token` - Signed session tokens

pub mod approvals;
pub mod auth;
pub mod email;
pub mod password;
pub mod registration;
pub mod token;

pub use approvals::{ApprovalOutcome, ApprovalQueue};
pub use auth::{AuthError, AuthService, LoginOutcome, LoginRequest};
pub use email::{EmailService, LogSender, NotificationError, OtpSender, generate_otp};
pub use password::{PasswordHashError, ValidationError};
pub use registration::{
    CompleteRequest, OtpIssued, OtpRequest, OtpVerified, RegistrationError, RegistrationOutcome,
    RegistrationService, VerifyRequest,
};
pub use token::{SessionClaims, TokenError, TokenService};
