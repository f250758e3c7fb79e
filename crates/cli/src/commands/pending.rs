//! Pending registration commands.

use std::io::Write;

use chrono::{DateTime, Utc};

use salon_server::db::{KeyValueStore, OtpRepository};

use super::CliError;

/// Print registrations still waiting for OTP verification or completion.
///
/// The email column is decoded from the store key, so it shows the address
/// the record is filed under even when the record body is hand-edited.
///
/// # Errors
///
/// Returns `CliError` if the node cannot be read or output fails.
pub async fn list(
    store: &dyn KeyValueStore,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let pending = OtpRepository::new(store).list().await?;
    if pending.is_empty() {
        writeln!(out, "No pending registrations")?;
        return Ok(());
    }

    for (key, record) in pending {
        let state = if record.is_expired_at(now) {
            "expired"
        } else if record.verified {
            "verified"
        } else {
            "awaiting code"
        };
        writeln!(
            out,
            "{email}\t{username}\t{role}\t{state}\t{expires}",
            email = key.decode(),
            username = record.username,
            role = record.role,
            expires = record.otp_expires_at.format("%Y-%m-%d %H:%M UTC"),
        )?;
    }
    Ok(())
}
