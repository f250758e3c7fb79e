//! Admin approval queue and account management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use salon_core::{AccountKey, ApprovalKey, Role};

use crate::db::AccountEntry;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{AccountDetails, ApprovalRecord};
use crate::services::{ApprovalOutcome, ApprovalQueue};
use crate::state::AppState;

/// A pending registration as shown to admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub key: String,
    pub record: PendingDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDetails {
    #[serde(flatten)]
    pub account: AccountDetails,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// An approved account as shown to admins.
#[derive(Debug, Serialize)]
pub struct AccountListing {
    pub key: String,
    pub role: Role,
    pub account: AccountDetails,
}

impl From<(ApprovalKey, ApprovalRecord)> for PendingApproval {
    fn from((key, record): (ApprovalKey, ApprovalRecord)) -> Self {
        Self {
            key: key.as_str().to_string(),
            record: PendingDetails {
                account: AccountDetails::from(&record.account),
                submitted_at: record.submitted_at,
            },
        }
    }
}

impl From<AccountEntry> for AccountListing {
    fn from(entry: AccountEntry) -> Self {
        Self {
            key: entry.key.as_str().to_string(),
            role: entry.role,
            account: AccountDetails::from(&entry.account),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountsQuery {
    pub role: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse::<Role>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_approval_key(raw: &str) -> Result<ApprovalKey> {
    ApprovalKey::parse(raw).map_err(|e| AppError::BadRequest(format!("Invalid approval key: {e}")))
}

/// `GET /admin/approvals`
pub async fn list_approvals(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingApproval>>> {
    let pending = ApprovalQueue::new(state.store()).pending().await?;
    Ok(Json(pending.into_iter().map(PendingApproval::from).collect()))
}

/// `POST /admin/approvals/{key}/accept`
pub async fn accept_approval(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApprovalOutcome>> {
    let key = parse_approval_key(&key)?;
    let outcome = ApprovalQueue::new(state.store()).accept(&key).await?;
    tracing::info!(admin = %admin.id, key = %key, "Approval accepted by admin");
    Ok(Json(outcome))
}

/// `POST /admin/approvals/{key}/reject`
pub async fn reject_approval(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApprovalOutcome>> {
    let key = parse_approval_key(&key)?;
    let outcome = ApprovalQueue::new(state.store()).reject(&key).await?;
    tracing::info!(admin = %admin.id, key = %key, "Approval rejected by admin");
    Ok(Json(outcome))
}

/// `GET /admin/accounts[?role=<Role>]`
pub async fn list_accounts(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AccountsQuery>,
) -> Result<Json<Vec<AccountListing>>> {
    let queue = ApprovalQueue::new(state.store());
    let entries = match query.role.as_deref() {
        Some(role) => queue.accounts_in(parse_role(role)?).await?,
        None => queue.accounts().await?,
    };
    Ok(Json(entries.into_iter().map(AccountListing::from).collect()))
}

/// `DELETE /admin/accounts/{role}/{key}`
pub async fn remove_account(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((role, key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let role = parse_role(&role)?;
    let key = AccountKey::parse(&key)
        .map_err(|e| AppError::BadRequest(format!("Invalid account key: {e}")))?;

    ApprovalQueue::new(state.store())
        .remove_account(role, &key)
        .await?;
    tracing::info!(admin = %admin.id, role = %role, key = %key, "Account removed by admin");
    Ok(StatusCode::NO_CONTENT)
}

