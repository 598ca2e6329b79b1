//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::search::CatalogCache;
use crate::services::emailjs::{EmailJsClient, EmailJsError};
use crate::services::email::Mailer;
use crate::services::gemini::{GeminiClient, GeminiError};
use crate::services::identity::{IdentityClient, IdentityError};
use crate::services::payments::{PaymentError, StripeClient};

/// Error building an integration client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("stripe client: {0}")]
    Payment(#[from] PaymentError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("emailjs client: {0}")]
    EmailJs(#[from] EmailJsError),
    #[error("gemini client: {0}")]
    Gemini(#[from] GeminiError),
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
    identity: IdentityClient,
    stripe: Option<StripeClient>,
    mailer: Option<Mailer>,
    emailjs: Option<EmailJsClient>,
    gemini: Option<GeminiClient>,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations are built only when configured.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let identity = IdentityClient::new(&config.identity)?;
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;
        let mailer = config.smtp.as_ref().map(Mailer::new).transpose()?;
        let emailjs = config.emailjs.as_ref().map(EmailJsClient::new).transpose()?;
        let gemini = config.gemini.as_ref().map(GeminiClient::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
                stripe,
                mailer,
                emailjs,
                gemini,
                catalog: CatalogCache::default(),
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

    /// Get a reference to the bearer-token verifier.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Stripe client, if card payments are enabled.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    /// SMTP mailer, if order emails are enabled.
    #[must_use]
    pub fn mailer(&self) -> Option<&Mailer> {
        self.inner.mailer.as_ref()
    }

    /// EmailJS client, if configured.
    #[must_use]
    pub fn emailjs(&self) -> Option<&EmailJsClient> {
        self.inner.emailjs.as_ref()
    }

    /// Gemini client, if image search is enabled.
    #[must_use]
    pub fn gemini(&self) -> Option<&GeminiClient> {
        self.inner.gemini.as_ref()
    }

    /// In-memory catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    /// State over a pool that never connects; for handlers that fail before
    /// touching the database.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn test_state(config: StorefrontConfig) -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://qui:pw@127.0.0.1:9/qui_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    #[tokio::test]
    async fn test_optional_integrations_absent_by_default() {
        let state = test_state(crate::config::tests::test_config());
        assert!(state.stripe().is_none());
        assert!(state.mailer().is_none());
        assert!(state.emailjs().is_none());
        assert!(state.gemini().is_none());
    }
}
