//! Approval queue commands.

use std::io::Write;

use salon_server::db::KeyValueStore;
use salon_server::services::{ApprovalOutcome, ApprovalQueue};

use super::{CliError, parse_approval_key};

/// Print pending registrations, oldest first, one per line.
///
/// # Errors
///
/// Returns `CliError` if the queue cannot be read or output fails.
pub async fn list(store: &dyn KeyValueStore, out: &mut impl Write) -> Result<(), CliError> {
    let pending = ApprovalQueue::new(store).pending().await?;
    if pending.is_empty() {
        writeln!(out, "No pending registrations")?;
        return Ok(());
    }

    for (key, record) in pending {
        let account = &record.account;
        writeln!(
            out,
            "{key}\t{role}\t{username}\t{email}\t{first} {last}\t{submitted}",
            role = account.role,
            username = account.username,
            email = account.email,
            first = account.first_name,
            last = account.last_name,
            submitted = record.submitted_at.format("%Y-%m-%d %H:%M UTC"),
        )?;
    }
    Ok(())
}

/// Accept a registration.
///
/// # Errors
///
/// Returns `CliError` for a malformed key or a store failure.
pub async fn accept(store: &dyn KeyValueStore, key: &str, out: &mut impl Write) -> Result<(), CliError> {
    let key = parse_approval_key(key)?;
    let outcome = ApprovalQueue::new(store).accept(&key).await?;
    report(out, &key.to_string(), &outcome)
}

/// Reject a registration.
///
/// # Errors
///
/// Returns `CliError` for a malformed key or a store failure.
pub async fn reject(store: &dyn KeyValueStore, key: &str, out: &mut impl Write) -> Result<(), CliError> {
    let key = parse_approval_key(key)?;
    let outcome = ApprovalQueue::new(store).reject(&key).await?;
    report(out, &key.to_string(), &outcome)
}

fn report(out: &mut impl Write, key: &str, outcome: &ApprovalOutcome) -> Result<(), CliError> {
    match outcome {
        ApprovalOutcome::Accepted { role, username } => {
            writeln!(out, "Accepted {username} as {role} ({role}/{key})")?;
        }
        ApprovalOutcome::Rejected => writeln!(out, "Rejected {key}")?,
        ApprovalOutcome::AlreadyResolved => writeln!(out, "Nothing to do: {key} was already resolved")?,
    }
    Ok(())
}
