//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{DatabaseConfig, ServerConfig};
use crate::db::{KeyValueStore, MemoryStore, RealtimeDatabase, StoreError};
use crate::services::{EmailService, LogSender, OtpSender, TokenService};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("store client: {0}")]
    Store(#[from] StoreError),
    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the store handle, the OTP sender and
/// the token service; services borrow from it per request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn KeyValueStore>,
    sender: Arc<dyn OtpSender>,
    tokens: TokenService,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Without SMTP settings, codes are logged instead of emailed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store client or SMTP transport cannot be built.
    pub fn new(config: ServerConfig) -> Result<Self, StateError> {
        let store = open_store(&config.database)?;

        let sender: Arc<dyn OtpSender> = match &config.email {
            Some(email) => Arc::new(EmailService::new(email)?),
            None => {
                tracing::warn!("SMTP_HOST not set; OTP codes will be logged, not emailed");
                Arc::new(LogSender)
            }
        };

        Ok(Self::with_parts(config, store, sender))
    }

    /// Create application state around an existing store and sender.
    #[must_use]
    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn KeyValueStore>,
        sender: Arc<dyn OtpSender>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expires_in);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                sender,
                tokens,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get the account store.
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.inner.store.as_ref()
    }

    /// Get the OTP sender.
    #[must_use]
    pub fn sender(&self) -> &dyn OtpSender {
        self.inner.sender.as_ref()
    }

    /// Get the session token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}

/// Open the store selected by configuration.
///
/// # Errors
///
/// Returns `StoreError` if the HTTP client cannot be built.
pub fn open_store(database: &DatabaseConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    Ok(match database {
        DatabaseConfig::Realtime { url, secret } => {
            Arc::new(RealtimeDatabase::new(url.clone(), secret.clone())?)
        }
        DatabaseConfig::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    })
}
