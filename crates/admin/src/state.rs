//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use strives_integrations::{
    EmailError, EmailService, ObjectStorage, SmsClient, SmsError, StorageError,
};

use crate::config::AdminConfig;
use crate::services::auth::TokenKeys;

/// Error building the outbound clients.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("object storage: {0}")]
    Storage(#[from] StorageError),
    #[error("SMS client: {0}")]
    Sms(#[from] SmsError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    tokens: TokenKeys,
    storage: ObjectStorage,
    sms: SmsClient,
    email: EmailService,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if an outbound client cannot be configured.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenKeys::new(&config.jwt);
        let storage = ObjectStorage::new(config.s3.clone())?;
        let sms = SmsClient::new(config.pinpoint.clone())?;
        let email = EmailService::new(&config.smtp)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                storage,
                sms,
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    #[must_use]
    pub fn storage(&self) -> &ObjectStorage {
        &self.inner.storage
    }

    #[must_use]
    pub fn sms(&self) -> &SmsClient {
        &self.inner.sms
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }
}
