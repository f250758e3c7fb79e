//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_DATABASE_URL` - Realtime Database base URL (`https://...`), or
//!   `memory:` for an in-process store
//! - `SALON_JWT_SECRET` - Session token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `FIREBASE_DATABASE_SECRET` - Database secret, sent as the `auth` parameter
//! - `SALON_JWT_EXPIRES_IN` - Token lifetime, `<n>[s|m|h|d]` (default: 1d)
//! - `SALON_HOST` - Bind address (default: 127.0.0.1)
//! - `SALON_PORT` - Listen port (default: 3000)
//! - `SALON_CORS_ORIGIN` - Front-end origin allowed by CORS (default: <http://localhost:5173>)
//! - `SMTP_HOST` - SMTP relay; when unset, codes are logged instead of emailed
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Required when `SMTP_HOST` is set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)
//! - `LOG_FORMAT` - `json` for JSON log lines (default: human-readable)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where account data lives.
#[derive(Clone)]
pub enum DatabaseConfig {
    /// A Firebase Realtime Database reached over REST.
    Realtime {
        url: Url,
        secret: Option<SecretString>,
    },
    /// In-process store; data is lost on exit.
    Memory,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Realtime { url, secret } => f
                .debug_struct("Realtime")
                .field("url", &url.as_str())
                .field("secret", &secret.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Server application configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Account store
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session token signing secret
    pub jwt_secret: SecretString,
    /// Session token lifetime
    pub jwt_expires_in: Duration,
    /// Front-end origin allowed by CORS
    pub cors_origin: String,
    /// SMTP settings; `None` means codes are only logged
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_in", &self.jwt_expires_in)
            .field("cors_origin", &self.cors_origin)
            .field("email", &self.email)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .field("log_json", &self.log_json)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig::from_env()?;
        let host = get_env_or_default("SALON_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SALON_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SALON_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SALON_PORT".to_string(), e.to_string()))?;
        let jwt_secret = get_validated_secret("SALON_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "SALON_JWT_SECRET")?;
        let jwt_expires_in = parse_lifetime(&get_env_or_default("SALON_JWT_EXPIRES_IN", "1d"))
            .map_err(|e| ConfigError::InvalidEnvVar("SALON_JWT_EXPIRES_IN".to_string(), e))?;
        let cors_origin = get_env_or_default("SALON_CORS_ORIGIN", "http://localhost:5173");
        let email = EmailConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let log_json = get_optional_env("LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Ok(Self {
            database,
            host,
            port,
            jwt_secret,
            jwt_expires_in,
            cors_origin,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            log_json,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load database settings. Also used by the operator CLI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or not http(s), or if the
    /// database secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("FIREBASE_DATABASE_URL")?;
        if raw.trim() == "memory:" {
            return Ok(Self::Memory);
        }

        let url = Url::parse(raw.trim()).map_err(|e| {
            ConfigError::InvalidEnvVar("FIREBASE_DATABASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "FIREBASE_DATABASE_URL".to_string(),
                "must be an http(s) URL".to_string(),
            ));
        }

        let secret = match get_optional_env("FIREBASE_DATABASE_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "FIREBASE_DATABASE_SECRET")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self::Realtime { url, secret })
    }
}

impl EmailConfig {
    /// SMTP settings are all-or-nothing, keyed on `SMTP_HOST`.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Blank counts as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a lifetime such as `90s`, `15m`, `12h` or `1d`.
fn parse_lifetime(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("expected <number>[s|m|h|d], got '{value}'"))?;
    if amount <= 0 {
        return Err("lifetime must be positive".to_string());
    }

    let seconds_per_unit = match unit {
        "s" | "" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        other => return Err(format!("unknown unit '{other}' (use s, m, h or d)")),
    };

    amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| format!("lifetime '{value}' is too large"))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
