//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::checkout::{CheckoutService, PgCheckoutStore};
use crate::services::email::EmailService;
use crate::stripe::{StripeClient, StripeError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; owns the database pool, the Stripe client and
/// the optional mailer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    stripe: StripeClient,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client or the SMTP transport cannot
    /// be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.base_url))
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The mailer, absent when SMTP is not configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// `PostgreSQL` store for the checkout flow.
    #[must_use]
    pub fn checkout_store(&self) -> PgCheckoutStore<'_> {
        PgCheckoutStore::new(&self.inner.pool)
    }

    /// Checkout service over `store` and the Stripe client.
    #[must_use]
    pub fn checkout<'a>(
        &'a self,
        store: &'a PgCheckoutStore<'a>,
    ) -> CheckoutService<'a, PgCheckoutStore<'a>, StripeClient> {
        CheckoutService::new(store, &self.inner.stripe, self.inner.config.stripe.currency)
    }
}
