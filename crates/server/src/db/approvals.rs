//! Approval queue repository (`ApprovalofAccounts` node).

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use salon_core::ApprovalKey;

use super::{KeyValueStore, StoreError, StorePath, decode, encode, read, read_children};
use crate::models::ApprovalRecord;

/// Store node holding completed registrations awaiting an admin decision.
pub const NODE: &str = "ApprovalofAccounts";

/// Repository for approval records.
pub struct ApprovalRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> ApprovalRepository<'a> {
    /// Create a new approval repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    fn path(key: &ApprovalKey) -> StorePath {
        StorePath::node(NODE).child(key.as_str())
    }

    /// A fresh queue key. Keys sort in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the generated key is not a valid store key.
    pub fn new_key(at: DateTime<Utc>) -> Result<ApprovalKey, StoreError> {
        let suffix = Uuid::new_v4().simple().to_string();
        let raw = format!(
            "-{:013}{}",
            at.timestamp_millis().max(0),
            suffix.get(..12).unwrap_or_default()
        );
        ApprovalKey::parse(&raw).map_err(|e| StoreError::Decode {
            path: StorePath::node(NODE).child(&raw).to_string(),
            reason: format!("unusable generated key: {e}"),
        })
    }

    /// Write a record at `key`, replacing whatever is there.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn put(&self, key: &ApprovalKey, record: &ApprovalRecord) -> Result<(), StoreError> {
        let path = Self::path(key);
        let value = encode(&path, record)?;
        self.store.put(&path, value).await
    }

    /// Get one record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails or the record is corrupt.
    pub async fn get(&self, key: &ApprovalKey) -> Result<Option<ApprovalRecord>, StoreError> {
        read(self.store, &Self::path(key)).await
    }

    /// All records awaiting a decision, oldest first. Undecodable records are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the queue cannot be read.
    pub async fn list(&self) -> Result<Vec<(ApprovalKey, ApprovalRecord)>, StoreError> {
        let node = StorePath::node(NODE);
        let children = read_children(self.store, &node).await?;
        Ok(children
            .into_iter()
            .filter_map(|(key, value)| approval_from(&node, &key, value))
            .collect())
    }

    /// Remove a record. Removing a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    pub async fn delete(&self, key: &ApprovalKey) -> Result<(), StoreError> {
        self.store.remove(&Self::path(key)).await
    }
}

fn approval_from(node: &StorePath, key: &str, value: Value) -> Option<(ApprovalKey, ApprovalRecord)> {
    let path = node.child(key);

    let key = match ApprovalKey::parse(key) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping approval with invalid key");
            return None;
        }
    };

    match decode(&path, value) {
        Ok(record) => Some((key, record)),
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping undecodable approval");
            None
        }
    }
}
