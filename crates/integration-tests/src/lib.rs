//! Integration tests for the Qui storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests (no services needed)
//! cargo test -p qui-integration-tests
//!
//! # Against a running storefront with a migrated, seeded database
//! STOREFRONT_URL=http://localhost:3000 cargo test -p qui-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `pricing_split` - Multi-seller totals through the public pricing API
//! - `catalog_search` - Fuzzy product search
//! - `storefront_api` - HTTP tests against a live server (ignored by default)

use reqwest::Client;

/// Default address of a locally running storefront.
pub const DEFAULT_STOREFRONT_URL: &str = "http://localhost:3000";

/// Shared HTTP client and base URL for live-server tests.
pub struct TestContext {
    pub client: Client,
    pub storefront_url: String,
}

impl TestContext {
    /// Build a context from `STOREFRONT_URL`, falling back to localhost.
    #[must_use]
    pub fn from_env() -> Self {
        let storefront_url = std::env::var("STOREFRONT_URL")
            .unwrap_or_else(|_| DEFAULT_STOREFRONT_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client: Client::new(),
            storefront_url,
        }
    }

    /// Absolute URL for a path on the storefront.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }
}
