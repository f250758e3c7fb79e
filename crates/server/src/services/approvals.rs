//! Admin approval queue and account management.
//!
//! Accepting copies the approval record into its role partition under the
//! same key, then deletes the approval record. Retrying an accept that died
//! halfway rewrites the same account instead of creating a second one.

use serde::Serialize;
use tracing::instrument;

use salon_core::{AccountKey, ApprovalKey, Role};

use crate::db::{AccountEntry, ApprovalRepository, DirectoryRepository, KeyValueStore, StoreError};
use crate::error::add_breadcrumb;
use crate::models::ApprovalRecord;

/// What an admin decision did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ApprovalOutcome {
    /// The account now exists in `role`'s partition.
    Accepted { role: Role, username: String },
    /// The registration was discarded.
    Rejected,
    /// Nothing to do: the record was already accepted or rejected.
    AlreadyResolved,
}

/// Approval queue service.
pub struct ApprovalQueue<'a> {
    approvals: ApprovalRepository<'a>,
    directory: DirectoryRepository<'a>,
}

impl<'a> ApprovalQueue<'a> {
    /// Create a new approval queue service.
    #[must_use]
    pub const fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            approvals: ApprovalRepository::new(store),
            directory: DirectoryRepository::new(store),
        }
    }

    /// Registrations waiting for a decision, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the queue cannot be read.
    pub async fn pending(&self) -> Result<Vec<(ApprovalKey, ApprovalRecord)>, StoreError> {
        self.approvals.list().await
    }

    /// Accept a registration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a read or write fails. The approval record is
    /// only deleted after the account is written.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn accept(&self, key: &ApprovalKey) -> Result<ApprovalOutcome, StoreError> {
        let Some(record) = self.approvals.get(key).await? else {
            tracing::info!("Approval already resolved");
            return Ok(ApprovalOutcome::AlreadyResolved);
        };

        let account = record.account;
        let role = account.role;
        let account_key = AccountKey::from(key.clone());

        self.directory
            .insert_account(role, &account_key, &account)
            .await?;
        self.approvals.delete(key).await?;

        tracing::info!(role = %role, username = %account.username, "Registration accepted");
        add_breadcrumb(
            "approvals",
            "Registration accepted",
            Some(&[("key", key.as_str()), ("role", role.as_str())]),
        );

        Ok(ApprovalOutcome::Accepted {
            role,
            username: account.username,
        })
    }

    /// Reject a registration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn reject(&self, key: &ApprovalKey) -> Result<ApprovalOutcome, StoreError> {
        if self.approvals.get(key).await?.is_none() {
            tracing::info!("Approval already resolved");
            return Ok(ApprovalOutcome::AlreadyResolved);
        }

        self.approvals.delete(key).await?;

        tracing::info!("Registration rejected");
        add_breadcrumb(
            "approvals",
            "Registration rejected",
            Some(&[("key", key.as_str())]),
        );
        Ok(ApprovalOutcome::Rejected)
    }

    /// Every approved account, Admin first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a partition cannot be read.
    pub async fn accounts(&self) -> Result<Vec<AccountEntry>, StoreError> {
        self.directory.list_all().await
    }

    /// Approved accounts of one role.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the partition cannot be read.
    pub async fn accounts_in(&self, role: Role) -> Result<Vec<AccountEntry>, StoreError> {
        self.directory.list_accounts(role).await
    }

    /// Delete an approved account. Deleting a missing account succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the delete fails.
    #[instrument(skip(self), fields(role = %role, key = %key))]
    pub async fn remove_account(&self, role: Role, key: &AccountKey) -> Result<(), StoreError> {
        self.directory.remove_account(role, key).await?;
        tracing::info!("Account removed");
        Ok(())
    }
}
