//! Key-value store access.
//!
//! # Store: Firebase Realtime Database (shared with the front-end)
//!
//! ## Nodes
//!
//! - `OTPVerification/{sanitizedEmail}` - pending registrations
//! - `ApprovalofAccounts/{pushKey}` - completed registrations awaiting an admin
//! - `Admin`, `ContentCreator`, `MarketingLead`, `GraphicDesigner` - approved
//!   accounts, one partition per role
//!
//! Every operation touches exactly one keyed location. Writes are
//! last-write-wins; the store offers no compare-and-swap, so neither do we.
//!
//! Repositories borrow a `&dyn KeyValueStore` and are built per request, the
//! same way services are.

pub mod approvals;
pub mod directory;
pub mod memory;
pub mod otp;
pub mod realtime;

use core::fmt;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use approvals::ApprovalRepository;
pub use directory::{AccountEntry, DirectoryRepository};
pub use memory::MemoryStore;
pub use otp::OtpRepository;
pub use realtime::RealtimeDatabase;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure or timeout; the store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Path of the failed operation.
        path: String,
    },

    /// A record does not match its schema (data corruption).
    #[error("invalid record at {path}: {reason}")]
    Decode {
        /// Path of the offending record.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl StoreError {
    /// Whether the error means the store itself is unreachable or failing,
    /// as opposed to holding bad data.
    #[must_use]
    pub const fn is_outage(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Status { .. })
    }
}

/// Location of a node, as a list of key segments below the database root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The database root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// A top-level node.
    #[must_use]
    pub fn node(name: &str) -> Self {
        Self::root().child(name)
    }

    /// A child of this node.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_owned());
        Self { segments }
    }

    /// Key segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// Future returned by store operations.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// A hierarchical JSON key-value store with Realtime Database semantics.
///
/// - reading a missing node yields `None` (never an error)
/// - `put` replaces the whole node, no merge
/// - `push` appends a child under a store-generated, time-ordered key
/// - `remove` is idempotent
pub trait KeyValueStore: Send + Sync {
    /// Read the node at `path`.
    fn get<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, Option<Value>>;

    /// Replace the node at `path`.
    fn put<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, ()>;

    /// Append a child under `path`, returning its generated key.
    fn push<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, String>;

    /// Delete the node at `path`.
    fn remove<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, ()>;

    /// Check that the store is reachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

// =============================================================================
// Typed helpers shared by the repositories
// =============================================================================

/// Decode a JSON value into a record.
pub(crate) fn decode<T: DeserializeOwned>(path: &StorePath, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a record as a JSON value.
pub(crate) fn encode<T: Serialize>(path: &StorePath, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Read and decode a single record.
pub(crate) async fn read<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    path: &StorePath,
) -> Result<Option<T>, StoreError> {
    match store.get(path).await? {
        Some(value) => decode(path, value).map(Some),
        None => Ok(None),
    }
}

/// Read the children of a collection node as `(key, value)` pairs.
///
/// A missing node is an empty collection. Anything but an object is corrupt.
pub(crate) async fn read_children(
    store: &dyn KeyValueStore,
    path: &StorePath,
) -> Result<Vec<(String, Value)>, StoreError> {
    match store.get(path).await? {
        None => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(other) => Err(StoreError::Decode {
            path: path.to_string(),
            reason: format!("expected a collection, found {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_display() {
        let path = StorePath::node("OTPVerification").child("bob@gmail%2Ecom");
        assert_eq!(path.to_string(), "/OTPVerification/bob@gmail%2Ecom");
        assert_eq!(StorePath::root().to_string(), "/");
    }

    #[test]
    fn test_child_does_not_mutate_parent() {
        let parent = StorePath::node("Admin");
        let child = parent.child("-Nx1");
        assert_eq!(parent.segments().len(), 1);
        assert_eq!(child.segments().len(), 2);
    }

    #[test]
    fn test_outage_classification() {
        assert!(StoreError::Unavailable("timeout".to_string()).is_outage());
        assert!(
            StoreError::Status {
                status: 503,
                path: "/".to_string()
            }
            .is_outage()
        );
        assert!(
            !StoreError::Decode {
                path: "/".to_string(),
                reason: "bad".to_string()
            }
            .is_outage()
        );
    }
}
