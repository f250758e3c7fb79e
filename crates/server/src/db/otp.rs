//! Pending registration repository (`OTPVerification` node).

use salon_core::{Email, StorageKey};
use serde_json::Value;

use super::{KeyValueStore, StoreError, StorePath, decode, encode, read, read_children};
use crate::models::PendingRegistration;

/// Store node holding pending registrations.
pub const NODE: &str = "OTPVerification";

/// Repository for pending registrations, keyed by sanitized email.
pub struct OtpRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Location of the record for `email`.
    #[must_use]
    pub fn path(email: &Email) -> StorePath {
        StorePath::node(NODE).child(StorageKey::from_email(email.as_str()).as_str())
    }

    /// Create or fully overwrite the record for `email`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    pub async fn save(&self, email: &Email, record: &PendingRegistration) -> Result<(), StoreError> {
        let path = Self::path(email);
        let value = encode(&path, record)?;
        self.store.put(&path, value).await
    }

    /// Get the record for `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails or the record is corrupt.
    pub async fn get(&self, email: &Email) -> Result<Option<PendingRegistration>, StoreError> {
        read(self.store, &Self::path(email)).await
    }

    /// Every pending registration with its key. Undecodable records are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the node cannot be read.
    pub async fn list(&self) -> Result<Vec<(StorageKey, PendingRegistration)>, StoreError> {
        let node = StorePath::node(NODE);
        let children = read_children(self.store, &node).await?;
        Ok(children
            .into_iter()
            .filter_map(|(key, value)| pending_from(&node, &key, value))
            .collect())
    }

    /// Delete the record for `email`. Deleting a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    pub async fn delete(&self, email: &Email) -> Result<(), StoreError> {
        self.store.remove(&Self::path(email)).await
    }
}

fn pending_from(node: &StorePath, key: &str, value: Value) -> Option<(StorageKey, PendingRegistration)> {
    let path = node.child(key);

    let key = match StorageKey::from_stored(key) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping pending registration with invalid key");
            return None;
        }
    };

    match decode(&path, value) {
        Ok(record) => Some((key, record)),
        Err(e) => {
            tracing::warn!(%path, error = %e, "Skipping undecodable pending registration");
            None
        }
    }
}
