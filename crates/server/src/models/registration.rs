//! Pending registration record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use salon_core::{ApprovalKey, Email, OtpCode, Role};

/// How long an OTP stays valid after it is issued.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Human-readable form of [`OTP_TTL_MINUTES`], returned to clients.
pub const OTP_TTL_DESCRIPTION: &str = "10 minutes";

/// Validity window of an OTP.
#[must_use]
pub const fn otp_ttl() -> Duration {
    Duration::minutes(OTP_TTL_MINUTES)
}

/// An in-progress signup, stored at `OTPVerification/{sanitizedEmail}`.
///
/// Exactly one per email; a new request overwrites the previous one.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Argon2 PHC string. The plaintext password is never stored.
    pub password_hash: String,
    pub role: Role,
    pub otp_code: OtpCode,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub otp_expires_at: DateTime<Utc>,
    /// Set once the OTP has been checked. Never goes back to `false`.
    #[serde(default)]
    pub verified: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Approval queue slot, reserved by the first completion attempt so a
    /// retried completion rewrites the same record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_key: Option<ApprovalKey>,
}

impl PendingRegistration {
    /// Whether the OTP has expired at `now`. The expiry instant itself is
    /// still valid.
    ///
    /// Compared in whole milliseconds, the precision the expiry is stored at.
    #[must_use]
    pub const fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.otp_expires_at.timestamp_millis()
    }
}

impl std::fmt::Debug for PendingRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistration")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("password_hash", &"[REDACTED]")
            .field("otp_code", &"[REDACTED]")
            .field("otp_expires_at", &self.otp_expires_at)
            .field("verified", &self.verified)
            .field("created_at", &self.created_at)
            .field("approval_key", &self.approval_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(created_at: DateTime<Utc>) -> PendingRegistration {
        PendingRegistration {
            email: Email::parse("bob@gmail.com").unwrap(),
            first_name: "Bob".to_string(),
            last_name: "Stone".to_string(),
            username: "bobstone".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            role: Role::ContentCreator,
            otp_code: OtpCode::parse("123456").unwrap(),
            otp_expires_at: created_at + otp_ttl(),
            verified: false,
            created_at,
            approval_key: None,
        }
    }

    #[test]
    fn test_serializes_camel_case_with_millisecond_timestamps() {
        let created_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let value = serde_json::to_value(record(created_at)).unwrap();

        assert_eq!(value["email"], "bob@gmail.com");
        assert_eq!(value["firstName"], "Bob");
        assert_eq!(value["passwordHash"].as_str().unwrap().get(..9), Some("$argon2id"));
        assert_eq!(value["role"], "ContentCreator");
        assert_eq!(value["otpCode"], "123456");
        assert_eq!(value["createdAt"], 1_700_000_000_000_i64);
        assert_eq!(value["otpExpiresAt"], 1_700_000_600_000_i64);
        assert_eq!(value["verified"], false);
        assert!(value.get("approvalKey").is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let created_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let pending = record(created_at);
        assert!(!pending.is_expired_at(pending.otp_expires_at));
        assert!(pending.is_expired_at(pending.otp_expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_expiry_survives_millisecond_storage() {
        let created_at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let stored: PendingRegistration =
            serde_json::from_value(serde_json::to_value(record(created_at)).unwrap()).unwrap();

        let deadline = created_at + otp_ttl();
        assert!(!stored.is_expired_at(deadline));
        assert!(stored.is_expired_at(deadline + Duration::milliseconds(1)));
    }

    #[test]
    fn test_debug_redacts_code_and_hash() {
        let pending = record(Utc::now());
        let debug_output = format!("{pending:?}");
        assert!(!debug_output.contains("123456"));
        assert!(!debug_output.contains("argon2id"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
