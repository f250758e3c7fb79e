//! Admin account bootstrap.
//!
//! Admin accounts cannot be self-registered; this is how the first (and
//! every later) admin gets into the `Admin` partition.

use chrono::Utc;

use salon_core::{AccountKey, Email, Role};
use salon_server::db::{DirectoryRepository, KeyValueStore};
use salon_server::models::{Account, Profile};
use salon_server::services::ValidationError;
use salon_server::services::password::{hash_password, validate_password};

use super::CliError;

/// Input for `admin create`.
pub struct NewAdmin<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
}

/// Create an admin account.
///
/// Refuses a username already present in any partition.
///
/// # Errors
///
/// Returns `CliError` on invalid input, a taken username or a store failure.
pub async fn create(store: &dyn KeyValueStore, new_admin: &NewAdmin<'_>) -> Result<AccountKey, CliError> {
    let username = new_admin.username.trim();
    let missing: Vec<&'static str> = [
        ("username", username),
        ("email", new_admin.email),
        ("firstName", new_admin.first_name),
        ("lastName", new_admin.last_name),
        ("password", new_admin.password),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing).into());
    }

    let email = Email::parse(new_admin.email).map_err(ValidationError::InvalidEmail)?;
    validate_password(new_admin.password)?;

    let directory = DirectoryRepository::new(store);
    if directory.find_by_username(username).await?.is_some() {
        return Err(CliError::UsernameTaken(username.to_string()));
    }

    let account = Account {
        email: email.into_inner(),
        first_name: new_admin.first_name.trim().to_string(),
        last_name: new_admin.last_name.trim().to_string(),
        username: username.to_string(),
        password_hash: hash_password(new_admin.password)?,
        role: Role::Admin,
        profile: Profile::default(),
        created_at: Utc::now(),
    };

    let key = directory.add_account(Role::Admin, &account).await?;
    tracing::info!(username = %username, key = %key, "Admin account created");
    Ok(key)
}
