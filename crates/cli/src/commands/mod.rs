//! Command implementations.
//!
//! Each command takes the store and an output writer so tests can run them
//! against the in-memory store.

pub mod accounts;
pub mod admin;
pub mod approvals;
pub mod pending;

use std::sync::Arc;

use thiserror::Error;

use salon_core::{AccountKey, ApprovalKey, Role, RoleError, StorageKeyError};
use salon_server::config::{ConfigError, DatabaseConfig};
use salon_server::db::{KeyValueStore, StoreError};
use salon_server::services::{PasswordHashError, ValidationError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Database settings missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Rejected input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Password hashing failed.
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),

    /// Unknown role name.
    #[error("{0}. Valid roles: Admin, ContentCreator, MarketingLead, GraphicDesigner")]
    InvalidRole(#[from] RoleError),

    /// Malformed store key.
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] StorageKeyError),

    /// Username already used by an account.
    #[error("An account with username '{0}' already exists")]
    UsernameTaken(String),

    /// Reading stdin or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the store named by `FIREBASE_DATABASE_URL`.
///
/// # Errors
///
/// Returns `CliError` if the settings are missing or the client cannot be built.
pub fn open_store() -> Result<Arc<dyn KeyValueStore>, CliError> {
    let database = DatabaseConfig::from_env()?;
    tracing::info!(database = ?database, "Opening store");
    Ok(salon_server::state::open_store(&database)?)
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, CliError> {
    Ok(raw.parse::<Role>()?)
}

pub(crate) fn parse_approval_key(raw: &str) -> Result<ApprovalKey, CliError> {
    Ok(ApprovalKey::parse(raw)?)
}

pub(crate) fn parse_account_key(raw: &str) -> Result<AccountKey, CliError> {
    Ok(AccountKey::parse(raw)?)
}
