//! Core types for the salon account service.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod key;
pub mod otp;
pub mod role;

pub use email::{Email, EmailError};
pub use key::{AccountKey, ApprovalKey, StorageKey, StorageKeyError};
pub use otp::{OtpCode, OtpCodeError};
pub use role::{Role, RoleError};
