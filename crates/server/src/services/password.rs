//! Password hashing and input rules shared by registration, login and the CLI.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;

use thiserror::Error;

use salon_core::EmailError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Rejected user input. Reported to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields are blank.
    #[error("All fields are required")]
    MissingFields(Vec<&'static str>),

    /// Username or password missing at login.
    #[error("Please provide username and password!")]
    MissingCredentials,

    /// The requested role cannot be chosen at registration.
    #[error("Invalid role specified")]
    InvalidRole(String),

    /// Malformed email address.
    #[error("Please provide a valid email address")]
    InvalidEmail(#[source] EmailError),

    /// Password shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("Password must be at least {min} characters long", min = MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    /// Password and its confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Hashing failed. Never caused by user input.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Check a new password against the length rule.
///
/// # Errors
///
/// Returns `ValidationError::PasswordTooShort` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt, as a PHC string.
///
/// # Errors
///
/// Returns `PasswordHashError` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// An unparseable hash never matches.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hash checked when no account matches, hashed with the same parameters as
/// real accounts so a miss costs as much as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no-such-account-placeholder").ok());

/// Run a full Argon2 verification that can never succeed.
///
/// Login calls this for unknown usernames so response time does not reveal
/// whether an account exists.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("samepassword").unwrap();
        let b = hash_password("samepassword").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unparseable_hash_never_matches() {
        assert!(!verify_password("anything", "plaintext-from-old-revision"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_password_length_rule() {
        assert_eq!(
            validate_password("1234567"),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(validate_password("12345678").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("ééééééé").is_err());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            ValidationError::MissingFields(vec!["email"]).to_string(),
            "All fields are required"
        );
    }

    #[test]
    fn test_dummy_hash_matches_account_parameters() {
        let dummy = PasswordHash::new(DUMMY_HASH.as_deref().unwrap()).unwrap();
        let real_hash = hash_password("correct horse").unwrap();
        let real = PasswordHash::new(&real_hash).unwrap();

        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.params, real.params);
        assert!(!verify_password("no-such-account", DUMMY_HASH.as_deref().unwrap()));
        verify_dummy_password("anything");
    }
}
