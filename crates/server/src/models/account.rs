//! Approved accounts and completed registrations awaiting approval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salon_core::Role;

/// Contact details collected at the last registration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub contact_number: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl Profile {
    /// Names of the fields that are blank, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("contactNumber", &self.contact_number),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zipCode", &self.zip_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// An account stored in one of the role partitions.
///
/// Every field defaults when absent: the partitions also hold records written
/// by hand in the database console and by an older revision of the app, which
/// spelled the username `Username`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, alias = "Username")]
    pub username: String,
    /// Argon2 PHC string.
    #[serde(default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account's username equals `username`, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn has_username(&self, username: &str) -> bool {
        let wanted = username.trim();
        !wanted.is_empty() && self.username.trim().to_lowercase() == wanted.to_lowercase()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A completed registration at `ApprovalofAccounts/{pushKey}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    #[serde(flatten)]
    pub account: Account,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: DateTime<Utc>,
}

/// Account fields safe to hand to the admin UI or a newly registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role: account.role,
        }
    }
}

/// Everything about an account except its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    #[serde(flatten)]
    pub summary: AccountSummary,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountDetails {
    fn from(account: &Account) -> Self {
        Self {
            summary: AccountSummary::from(account),
            profile: account.profile.clone(),
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_legacy_username_spelling() {
        let account: Account = serde_json::from_value(json!({
            "Username": "alice123",
            "role": "MarketingLead",
        }))
        .unwrap();
        assert_eq!(account.username, "alice123");
        assert_eq!(account.created_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_has_username_ignores_case() {
        let account: Account = serde_json::from_value(json!({
            "username": "alice123",
            "role": "ContentCreator",
        }))
        .unwrap();
        assert!(account.has_username("ALICE123"));
        assert!(account.has_username(" alice123 "));
        assert!(!account.has_username("alice12"));
        assert!(!account.has_username(""));
    }

    #[test]
    fn test_approval_record_is_flat() {
        let record: ApprovalRecord = serde_json::from_value(json!({
            "email": "bob@gmail.com",
            "username": "bobstone",
            "role": "ContentCreator",
            "contactNumber": "555-0100",
            "zipCode": "10001",
            "createdAt": 1_700_000_000_000_i64,
            "submittedAt": 1_700_000_100_000_i64,
        }))
        .unwrap();
        assert_eq!(record.account.profile.contact_number, "555-0100");
        assert_eq!(record.account.profile.zip_code, "10001");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["submittedAt"], 1_700_000_100_000_i64);
        assert_eq!(value["city"], "");
        assert!(value.get("profile").is_none());
    }

    #[test]
    fn test_missing_profile_fields() {
        let profile = Profile {
            contact_number: "555-0100".to_string(),
            city: " ".to_string(),
            ..Profile::default()
        };
        assert_eq!(
            profile.missing_fields(),
            vec!["city", "state", "country", "zipCode"]
        );
    }

    #[test]
    fn test_summary_omits_password_hash() {
        let account: Account = serde_json::from_value(json!({
            "username": "bobstone",
            "passwordHash": "$argon2id$secret",
            "role": "GraphicDesigner",
        }))
        .unwrap();
        let value = serde_json::to_value(AccountSummary::from(&account)).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert_eq!(value["role"], "GraphicDesigner");
    }

    #[test]
    fn test_details_omit_password_hash() {
        let account: Account = serde_json::from_value(json!({
            "email": "gina@salon.com",
            "username": "gina",
            "passwordHash": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA",
            "role": "GraphicDesigner",
            "city": "Austin",
            "createdAt": 1_700_000_000_000_i64,
        }))
        .unwrap();

        let value = serde_json::to_value(AccountDetails::from(&account)).unwrap();
        assert_eq!(value["username"], "gina");
        assert_eq!(value["role"], "GraphicDesigner");
        assert_eq!(value["city"], "Austin");
        assert_eq!(value["createdAt"], 1_700_000_000_000_i64);
        assert!(value.get("passwordHash").is_none());
    }
}
