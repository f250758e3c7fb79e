//! Username/password login against the account directory.

mod error;

pub use error::AuthError;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{DirectoryRepository, KeyValueStore};
use crate::models::AccountSummary;
use crate::services::password::{ValidationError, verify_dummy_password, verify_password};
use crate::services::token::TokenService;

/// Login form.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: AccountSummary,
}

/// Authentication service.
pub struct AuthService<'a> {
    directory: DirectoryRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore, tokens: &'a TokenService) -> Self {
        Self {
            directory: DirectoryRepository::new(store),
            tokens,
        }
    }

    /// Login with username and password.
    ///
    /// The username is matched case-insensitively across every partition,
    /// Admin first. The token's role is the partition the account was found in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown username and for
    /// a wrong password alike.
    #[instrument(skip_all, fields(username = %request.username.trim()))]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, AuthError> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let Some(entry) = self.directory.find_by_username(username).await? else {
            verify_dummy_password(&request.password);
            tracing::info!("Login failed: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&request.password, &entry.account.password_hash) {
            tracing::info!(role = %entry.role, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&entry.account.username, entry.role)?;
        let mut user = AccountSummary::from(&entry.account);
        user.role = entry.role;

        tracing::info!(role = %entry.role, "Login succeeded");
        Ok(LoginOutcome { token, user })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    use salon_core::Role;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Account, Profile};
    use crate::services::password::hash_password;

    fn tokens() -> TokenService {
        TokenService::new(
            &SecretString::from("q8Zr!v2#Lm9@Tx4$Wp7^Kd1&Hs6*Nb3%"),
            Duration::days(1),
        )
    }

    async fn seed(store: &MemoryStore, username: &str, password: &str, role: Role) {
        let account = Account {
            email: format!("{}@salon.com", username.to_lowercase()),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            role,
            profile: Profile::default(),
            created_at: Utc::now(),
        };
        DirectoryRepository::new(store)
            .add_account(role, &account)
            .await
            .unwrap();
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_issues_token_with_partition_role() {
        let store = MemoryStore::new();
        seed(&store, "mia", "correct-password", Role::MarketingLead).await;
        let tokens = tokens();
        let service = AuthService::new(&store, &tokens);

        let outcome = service.login(&login("MIA", "correct-password")).await.unwrap();
        assert_eq!(outcome.user.role, Role::MarketingLead);
        assert_eq!(outcome.user.username, "mia");

        let claims = tokens.validate(&outcome.token).unwrap();
        assert_eq!(claims.id, "mia");
        assert_eq!(claims.role, Role::MarketingLead);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let store = MemoryStore::new();
        seed(&store, "mia", "correct-password", Role::MarketingLead).await;
        let tokens = tokens();
        let service = AuthService::new(&store, &tokens);

        let wrong = service.login(&login("mia", "wrong-password")).await.unwrap_err();
        let unknown = service.login(&login("nobody", "whatever1")).await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_legacy_plaintext_password_never_matches() {
        let store = MemoryStore::new();
        store
            .put(
                &crate::db::StorePath::node("ContentCreator").child("-old"),
                serde_json::json!({"Username": "legacy", "password": "plaintext1"}),
            )
            .await
            .unwrap();
        let tokens = tokens();
        let service = AuthService::new(&store, &tokens);

        assert!(matches!(
            service.login(&login("legacy", "plaintext1")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_blank_credentials() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let service = AuthService::new(&store, &tokens);

        assert!(matches!(
            service.login(&login("  ", "x")).await,
            Err(AuthError::Validation(ValidationError::MissingCredentials))
        ));
        assert!(matches!(
            service.login(&login("mia", "")).await,
            Err(AuthError::Validation(ValidationError::MissingCredentials))
        ));
    }
}
