//! OTP-gated registration.
//!
//! ```text
//! NoRequest --request--> Pending(unverified) --verify--> Pending(verified) --complete--> Completed
//!     ^                        |    ^
//!     +---- re-request --------+----+  (overwrites code and expiry)
//! ```
//!
//! The pending record lives at `OTPVerification/{sanitizedEmail}`. Completion
//! moves it into the approval queue; nothing is written to the role
//! partitions until an admin accepts it.
//!
//! Every operation has an `_at` variant taking the current time, which is what
//! the plain variants call with `Utc::now()`.

mod error;

pub use error::RegistrationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use salon_core::{ApprovalKey, Email, Role};

use crate::db::{ApprovalRepository, DirectoryRepository, KeyValueStore, OtpRepository};
use crate::error::add_breadcrumb;
use crate::models::registration::{OTP_TTL_DESCRIPTION, otp_ttl};
use crate::models::{Account, AccountSummary, ApprovalRecord, PendingRegistration, Profile};
use crate::services::email::{OtpSender, generate_otp};
use crate::services::password::{ValidationError, hash_password, validate_password};
use crate::services::token::TokenService;

/// First step: the signup form.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtpRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub retype_password: String,
    pub role: String,
}

impl OtpRequest {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("email", &self.email),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("username", &self.username),
            ("password", &self.password),
            ("retypePassword", &self.retype_password),
            ("role", &self.role),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Second step: the code from the email.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyRequest {
    pub email: String,
    pub otp: String,
}

/// Third step: contact details.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteRequest {
    pub email: String,
    #[serde(flatten)]
    pub profile: Profile,
}

/// Result of a successful request step. Never contains the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssued {
    pub email: String,
    pub expires_in: &'static str,
}

/// Result of a successful verify step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpVerified {
    pub email: String,
    pub verified: bool,
}

/// Result of a successful completion.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub token: String,
    pub user: AccountSummary,
    /// Where the registration waits for an admin.
    #[serde(skip)]
    pub approval_key: ApprovalKey,
}

/// Registration state machine.
pub struct RegistrationService<'a> {
    otps: OtpRepository<'a>,
    directory: DirectoryRepository<'a>,
    approvals: ApprovalRepository<'a>,
    sender: &'a dyn OtpSender,
    tokens: &'a TokenService,
}

impl<'a> RegistrationService<'a> {
    /// Create a new registration service.
    #[must_use]
    pub const fn new(
        store: &'a dyn KeyValueStore,
        sender: &'a dyn OtpSender,
        tokens: &'a TokenService,
    ) -> Self {
        Self {
            otps: OtpRepository::new(store),
            directory: DirectoryRepository::new(store),
            approvals: ApprovalRepository::new(store),
            sender,
            tokens,
        }
    }

    /// Validate the signup form, store a pending registration with a fresh
    /// code and send the code to the applicant.
    ///
    /// # Errors
    ///
    /// See [`RegistrationService::request_otp_at`].
    pub async fn request_otp(&self, request: &OtpRequest) -> Result<OtpIssued, RegistrationError> {
        self.request_otp_at(request, Utc::now()).await
    }

    /// [`RegistrationService::request_otp`] at a given time.
    ///
    /// Checks run in this order: blank fields, role, email, password length,
    /// password confirmation, username availability. A previous pending
    /// registration for the same email is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Validation` or `UsernameTaken` for rejected
    /// input, `Store` if the store fails, and `Notification` if the code was
    /// stored but could not be delivered.
    #[instrument(skip_all, fields(email = %request.email.trim(), role = %request.role))]
    pub async fn request_otp_at(
        &self,
        request: &OtpRequest,
        now: DateTime<Utc>,
    ) -> Result<OtpIssued, RegistrationError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        let role = request
            .role
            .trim()
            .parse::<Role>()
            .ok()
            .filter(Role::is_self_registrable)
            .ok_or_else(|| ValidationError::InvalidRole(request.role.clone()))?;

        let email = Email::parse(&request.email).map_err(ValidationError::InvalidEmail)?;

        validate_password(&request.password)?;
        if request.password != request.retype_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        let username = request.username.trim();
        if self.directory.is_username_taken(username).await? {
            return Err(RegistrationError::UsernameTaken);
        }

        let otp_code = generate_otp()?;
        let record = PendingRegistration {
            email: email.clone(),
            first_name: request.first_name.trim().to_owned(),
            last_name: request.last_name.trim().to_owned(),
            username: username.to_owned(),
            password_hash: hash_password(&request.password)?,
            role,
            otp_code,
            otp_expires_at: now + otp_ttl(),
            verified: false,
            created_at: now,
            approval_key: None,
        };

        self.otps.save(&email, &record).await?;
        tracing::info!(expires_at = %record.otp_expires_at, "Pending registration stored");

        // The record stays in place if delivery fails; a new request
        // replaces it with a fresh code.
        if let Err(e) = self
            .sender
            .send_otp(&email, &record.otp_code, OTP_TTL_DESCRIPTION)
            .await
        {
            tracing::error!(error = %e, "Failed to deliver OTP");
            return Err(e.into());
        }

        Ok(OtpIssued {
            email: email.into_inner(),
            expires_in: OTP_TTL_DESCRIPTION,
        })
    }

    /// Check the submitted code and mark the registration verified.
    ///
    /// # Errors
    ///
    /// See [`RegistrationService::verify_otp_at`].
    pub async fn verify_otp(&self, request: &VerifyRequest) -> Result<OtpVerified, RegistrationError> {
        self.verify_otp_at(request, Utc::now()).await
    }

    /// [`RegistrationService::verify_otp`] at a given time.
    ///
    /// Verifying an already verified registration with the right code
    /// succeeds again without rewriting the record.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchRequest` without a pending registration, `Expired` once
    /// the expiry instant has passed (whatever the code), and `CodeMismatch`
    /// for a wrong code.
    #[instrument(skip_all, fields(email = %request.email.trim()))]
    pub async fn verify_otp_at(
        &self,
        request: &VerifyRequest,
        now: DateTime<Utc>,
    ) -> Result<OtpVerified, RegistrationError> {
        let missing: Vec<&'static str> = [("email", &request.email), ("otp", &request.otp)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        let email = Email::parse(&request.email).map_err(ValidationError::InvalidEmail)?;

        let mut record = self
            .otps
            .get(&email)
            .await?
            .ok_or(RegistrationError::NoSuchRequest)?;

        if record.is_expired_at(now) {
            return Err(RegistrationError::Expired);
        }

        if !record.otp_code.matches(&request.otp) {
            return Err(RegistrationError::CodeMismatch);
        }

        if !record.verified {
            record.verified = true;
            self.otps.save(&email, &record).await?;
            tracing::info!("Email verified");
        }

        Ok(OtpVerified {
            email: email.into_inner(),
            verified: true,
        })
    }

    /// Attach contact details, queue the registration for approval and sign
    /// the applicant in.
    ///
    /// # Errors
    ///
    /// See [`RegistrationService::complete_at`].
    pub async fn complete(&self, request: &CompleteRequest) -> Result<RegistrationOutcome, RegistrationError> {
        self.complete_at(request, Utc::now()).await
    }

    /// [`RegistrationService::complete`] at a given time.
    ///
    /// The first attempt reserves an approval key on the pending record. The
    /// approval is then written at that key and the pending record deleted.
    /// A retry after a failure anywhere in between rewrites the same approval
    /// instead of queueing a second one.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank fields, `NoSuchRequest` without a
    /// pending registration and `NotVerified` before the code was checked.
    #[instrument(skip_all, fields(email = %request.email.trim()))]
    pub async fn complete_at(
        &self,
        request: &CompleteRequest,
        now: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let mut missing = Vec::new();
        if request.email.trim().is_empty() {
            missing.push("email");
        }
        missing.extend(request.profile.missing_fields());
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        let email = Email::parse(&request.email).map_err(ValidationError::InvalidEmail)?;

        let mut record = self
            .otps
            .get(&email)
            .await?
            .ok_or(RegistrationError::NoSuchRequest)?;

        if !record.verified {
            return Err(RegistrationError::NotVerified);
        }

        let approval_key = if let Some(key) = record.approval_key.clone() {
            key
        } else {
            let key = ApprovalRepository::new_key(now)?;
            record.approval_key = Some(key.clone());
            self.otps.save(&email, &record).await?;
            key
        };

        let profile = &request.profile;
        let approval = ApprovalRecord {
            account: Account {
                email: record.email.into_inner(),
                first_name: record.first_name,
                last_name: record.last_name,
                username: record.username,
                password_hash: record.password_hash,
                role: record.role,
                profile: Profile {
                    contact_number: profile.contact_number.trim().to_owned(),
                    city: profile.city.trim().to_owned(),
                    state: profile.state.trim().to_owned(),
                    country: profile.country.trim().to_owned(),
                    zip_code: profile.zip_code.trim().to_owned(),
                },
                created_at: now,
            },
            submitted_at: now,
        };

        self.approvals.put(&approval_key, &approval).await?;
        self.otps.delete(&email).await?;

        let account = &approval.account;
        tracing::info!(
            approval_key = %approval_key,
            username = %account.username,
            role = %account.role,
            "Registration submitted for approval"
        );
        add_breadcrumb(
            "registration",
            "Registration submitted for approval",
            Some(&[
                ("approval_key", approval_key.as_str()),
                ("role", account.role.as_str()),
            ]),
        );

        let token = self.tokens.issue_at(&account.username, account.role, now)?;

        Ok(RegistrationOutcome {
            token,
            user: AccountSummary::from(account),
            approval_key,
        })
    }
}
