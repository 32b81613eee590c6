//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use strives_integrations::{
    EmailService, RazorpayClient, SmsClient, SmsError, email::EmailError,
};

use crate::config::StorefrontConfig;
use crate::services::auth::TokenKeys;
use crate::services::taxonomy::TaxonomyCache;

/// Error building the outbound clients.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("SMS client: {0}")]
    Sms(#[from] SmsError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    tokens: TokenKeys,
    sms: SmsClient,
    email: EmailService,
    payments: RazorpayClient,
    taxonomy: TaxonomyCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound client cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenKeys::new(&config.jwt);
        let sms = SmsClient::new(config.pinpoint.clone())?;
        let email = EmailService::new(&config.smtp)?;
        let payments = RazorpayClient::new(config.razorpay.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                sms,
                email,
                payments,
                taxonomy: TaxonomyCache::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
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
    pub fn sms(&self) -> &SmsClient {
        &self.inner.sms
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn payments(&self) -> &RazorpayClient {
        &self.inner.payments
    }

    #[must_use]
    pub fn taxonomy(&self) -> &TaxonomyCache {
        &self.inner.taxonomy
    }
}
