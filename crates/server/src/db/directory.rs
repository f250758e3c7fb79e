//! Approved account directory, one store node per role.

use futures::future::try_join_all;
use serde_json::Value;

use salon_core::{AccountKey, Role};

use super::{KeyValueStore, StoreError, StorePath, decode, encode, read_children};
use crate::models::Account;

/// An account together with where it lives.
#[derive(Debug, Clone)]
pub struct AccountEntry {
    pub key: AccountKey,
    /// The partition the account was found in. Authoritative over the
    /// record's own `role` field.
    pub role: Role,
    pub account: Account,
}

/// Repository for the role partitions.
pub struct DirectoryRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> DirectoryRepository<'a> {
    /// Create a new directory repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    fn partition_path(role: Role) -> StorePath {
        StorePath::node(role.partition())
    }

    fn account_path(role: Role, key: &AccountKey) -> StorePath {
        Self::partition_path(role).child(key.as_str())
    }

    /// Whether any self-registrable partition already has `username`
    /// (case-insensitive). Admin usernames are not considered.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a partition cannot be read.
    pub async fn is_username_taken(&self, username: &str) -> Result<bool, StoreError> {
        let partitions = self.read_partitions(&Role::REGISTRABLE).await?;
        Ok(partitions
            .iter()
            .flatten()
            .any(|entry| entry.account.has_username(username)))
    }

    /// Find the account with `username` (case-insensitive), searching Admin,
    /// `ContentCreator`, `MarketingLead` then `GraphicDesigner`. The first match wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a partition cannot be read.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<AccountEntry>, StoreError> {
        let partitions = self.read_partitions(&Role::ALL).await?;
        Ok(partitions
            .into_iter()
            .flatten()
            .find(|entry| entry.account.has_username(username)))
    }

    /// Append an account to `role`'s partition under a generated key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn add_account(&self, role: Role, account: &Account) -> Result<AccountKey, StoreError> {
        let path = Self::partition_path(role);
        let value = encode(&path, account)?;
        let key = self.store.push(&path, value).await?;
        AccountKey::parse(&key).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: format!("store generated an unusable key: {e}"),
        })
    }

    /// Write an account at a known key, replacing whatever is there.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn insert_account(
        &self,
        role: Role,
        key: &AccountKey,
        account: &Account,
    ) -> Result<(), StoreError> {
        let path = Self::account_path(role, key);
        let value = encode(&path, account)?;
        self.store.put(&path, value).await
    }

    /// Delete an account. Deleting a missing account succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    pub async fn remove_account(&self, role: Role, key: &AccountKey) -> Result<(), StoreError> {
        self.store.remove(&Self::account_path(role, key)).await
    }

    /// All accounts in one partition, in key order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the partition cannot be read.
    pub async fn list_accounts(&self, role: Role) -> Result<Vec<AccountEntry>, StoreError> {
        let path = Self::partition_path(role);
        let children = read_children(self.store, &path).await?;
        Ok(children
            .into_iter()
            .filter_map(|(key, value)| entry_from(&path, role, key, value))
            .collect())
    }

    /// All accounts in every partition, Admin first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a partition cannot be read.
    pub async fn list_all(&self) -> Result<Vec<AccountEntry>, StoreError> {
        let partitions = self.read_partitions(&Role::ALL).await?;
        Ok(partitions.into_iter().flatten().collect())
    }

    /// Read several partitions concurrently. Results come back in the order
    /// of `roles`, whatever order the reads complete in.
    async fn read_partitions(&self, roles: &[Role]) -> Result<Vec<Vec<AccountEntry>>, StoreError> {
        try_join_all(roles.iter().map(|role| self.list_accounts(*role))).await
    }
}

/// Decode one partition child.
///
/// Records that cannot be decoded are skipped with a warning instead of
/// failing the whole listing; the partitions are also edited by hand.
fn entry_from(partition: &StorePath, role: Role, key: String, mut value: Value) -> Option<AccountEntry> {
    let path = partition.child(&key);

    let key = match AccountKey::parse(&key) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping account with invalid key");
            return None;
        }
    };

    // Records predating the role field belong to their partition's role.
    if let Value::Object(map) = &mut value {
        map.entry("role")
            .or_insert_with(|| Value::String(role.as_str().to_owned()));
    }

    match decode::<Account>(&path, value) {
        Ok(account) => Some(AccountEntry { key, role, account }),
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping undecodable account");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Profile;

    fn account(username: &str, role: Role) -> Account {
        Account {
            email: format!("{username}@salon.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            role,
            profile: Profile::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_username_taken_is_case_insensitive() {
        let store = MemoryStore::new();
        let repo = DirectoryRepository::new(&store);
        repo.add_account(Role::ContentCreator, &account("alice123", Role::ContentCreator))
            .await
            .unwrap();

        assert!(repo.is_username_taken("ALICE123").await.unwrap());
        assert!(repo.is_username_taken("alice123").await.unwrap());
        assert!(!repo.is_username_taken("alice1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_usernames_do_not_block_registration() {
        let store = MemoryStore::new();
        let repo = DirectoryRepository::new(&store);
        repo.add_account(Role::Admin, &account("owner", Role::Admin))
            .await
            .unwrap();

        assert!(!repo.is_username_taken("owner").await.unwrap());
        assert!(repo.find_by_username("owner").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_prefers_admin_partition() {
        let store = MemoryStore::new();
        let repo = DirectoryRepository::new(&store);
        repo.add_account(Role::GraphicDesigner, &account("sam", Role::GraphicDesigner))
            .await
            .unwrap();
        repo.add_account(Role::Admin, &account("Sam", Role::Admin))
            .await
            .unwrap();

        let found = repo.find_by_username("SAM").await.unwrap().unwrap();
        assert_eq!(found.role, Role::Admin);
        assert_eq!(found.account.username, "Sam");
    }

    #[tokio::test]
    async fn test_partition_decides_role() {
        let store = MemoryStore::new();
        store
            .put(
                &StorePath::node("MarketingLead").child("-legacy1"),
                json!({"Username": "oldtimer", "passwordHash": "x"}),
            )
            .await
            .unwrap();

        let repo = DirectoryRepository::new(&store);
        let found = repo.find_by_username("oldtimer").await.unwrap().unwrap();
        assert_eq!(found.role, Role::MarketingLead);
        assert_eq!(found.account.role, Role::MarketingLead);
        assert_eq!(found.key.as_str(), "-legacy1");
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped() {
        let store = MemoryStore::new();
        let partition = StorePath::node("ContentCreator");
        store
            .put(&partition.child("-bad"), json!("not an account"))
            .await
            .unwrap();
        store
            .put(&partition.child("-good"), json!({"username": "ok"}))
            .await
            .unwrap();

        let repo = DirectoryRepository::new(&store);
        let accounts = repo.list_accounts(Role::ContentCreator).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts.first().unwrap().account.username, "ok");
    }

    #[tokio::test]
    async fn test_insert_and_remove_at_key() {
        let store = MemoryStore::new();
        let repo = DirectoryRepository::new(&store);
        let key = AccountKey::parse("-Nx42").unwrap();

        repo.insert_account(Role::MarketingLead, &key, &account("mia", Role::MarketingLead))
            .await
            .unwrap();
        repo.insert_account(Role::MarketingLead, &key, &account("mia", Role::MarketingLead))
            .await
            .unwrap();
        assert_eq!(repo.list_accounts(Role::MarketingLead).await.unwrap().len(), 1);

        repo.remove_account(Role::MarketingLead, &key).await.unwrap();
        repo.remove_account(Role::MarketingLead, &key).await.unwrap();
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_orders_admin_first() {
        let store = MemoryStore::new();
        let repo = DirectoryRepository::new(&store);
        repo.add_account(Role::GraphicDesigner, &account("gd", Role::GraphicDesigner))
            .await
            .unwrap();
        repo.add_account(Role::Admin, &account("boss", Role::Admin))
            .await
            .unwrap();

        let roles: Vec<Role> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.role)
            .collect();
        assert_eq!(roles, vec![Role::Admin, Role::GraphicDesigner]);
    }

    #[tokio::test]
    async fn test_outage_propagates() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let repo = DirectoryRepository::new(&store);
        assert!(matches!(
            repo.is_username_taken("x").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
