//! OTP delivery.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! settings the server falls back to [`LogSender`], which only logs the code.

use askama::Template;
use futures::FutureExt;
use futures::future::BoxFuture;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use salon_core::{Email, OtpCode};

use crate::config::EmailConfig;

/// Subject line of the OTP email.
pub const OTP_SUBJECT: &str = "Your OTP for Registration";

/// HTML template for the OTP email.
#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpEmailHtml<'a> {
    code: &'a str,
    valid_for: &'a str,
}

/// Plain text template for the OTP email.
#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpEmailText<'a> {
    code: &'a str,
    valid_for: &'a str,
}

/// Errors that can occur when delivering a code.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Delivery refused by a non-SMTP sender.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Something that can deliver an OTP to an email address.
///
/// The call completes once the message has been handed off (or has failed).
pub trait OtpSender: Send + Sync {
    /// Deliver `code` to `to`, telling the recipient it is valid for `valid_for`.
    fn send_otp<'a>(
        &'a self,
        to: &'a Email,
        code: &'a OtpCode,
        valid_for: &'a str,
    ) -> BoxFuture<'a, Result<(), NotificationError>>;
}

/// Email service for sending OTP emails over SMTP.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    async fn send_code(&self, to: &Email, code: &OtpCode, valid_for: &str) -> Result<(), NotificationError> {
        let code = code.as_str();
        let html = OtpEmailHtml { code, valid_for }.render()?;
        let text = OtpEmailText { code, valid_for }.render()?;

        self.send_multipart_email(to.as_str(), OTP_SUBJECT, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

impl OtpSender for EmailService {
    fn send_otp<'a>(
        &'a self,
        to: &'a Email,
        code: &'a OtpCode,
        valid_for: &'a str,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        self.send_code(to, code, valid_for).boxed()
    }
}

/// Tracing target for codes written by [`LogSender`]; kept out of Sentry.
pub const OTP_LOG_TARGET: &str = "salon_server::otp_log";

/// Development sender: writes the code to the log instead of emailing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl OtpSender for LogSender {
    fn send_otp<'a>(
        &'a self,
        to: &'a Email,
        code: &'a OtpCode,
        valid_for: &'a str,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        tracing::info!(
            target: OTP_LOG_TARGET,
            to = %to,
            code = %code,
            valid_for = %valid_for,
            "SMTP not configured; OTP logged instead of emailed"
        );
        futures::future::ready(Ok(())).boxed()
    }
}

/// Generate a uniformly random 6-digit code.
///
/// # Errors
///
/// Never fails in practice: the generated number is always in range.
pub fn generate_otp() -> Result<OtpCode, salon_core::OtpCodeError> {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(OtpCode::MIN..OtpCode::MAX_EXCLUSIVE);
    OtpCode::from_number(code)
}
