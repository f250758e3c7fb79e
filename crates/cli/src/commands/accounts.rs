//! Approved account commands.

use std::io::Write;

use salon_server::db::KeyValueStore;
use salon_server::services::ApprovalQueue;

use super::{CliError, parse_account_key, parse_role};

/// Print approved accounts, optionally for one role only.
///
/// # Errors
///
/// Returns `CliError` for an unknown role or a store failure.
pub async fn list(store: &dyn KeyValueStore, role: Option<&str>, out: &mut impl Write) -> Result<(), CliError> {
    let queue = ApprovalQueue::new(store);
    let entries = match role {
        Some(role) => queue.accounts_in(parse_role(role)?).await?,
        None => queue.accounts().await?,
    };

    if entries.is_empty() {
        writeln!(out, "No accounts")?;
        return Ok(());
    }

    for entry in entries {
        writeln!(
            out,
            "{role}\t{key}\t{username}\t{email}",
            role = entry.role,
            key = entry.key,
            username = entry.account.username,
            email = entry.account.email,
        )?;
    }
    Ok(())
}

/// Remove an approved account. Removing a missing account succeeds.
///
/// # Errors
///
/// Returns `CliError` for an unknown role, a malformed key or a store failure.
pub async fn remove(store: &dyn KeyValueStore, role: &str, key: &str, out: &mut impl Write) -> Result<(), CliError> {
    let role = parse_role(role)?;
    let key = parse_account_key(key)?;
    ApprovalQueue::new(store).remove_account(role, &key).await?;
    writeln!(out, "Removed {role}/{key}")?;
    Ok(())
}
