//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FIREBASE_API_KEY` - Web API key used to look up bearer tokens
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL, used when a request has no `Origin` (default: `http://localhost:3000`)
//! - `APP_ENV` - Deployment environment name (default: development)
//! - `STRIPE_SECRET_KEY` - Enables card checkout
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret for `/api/stripe/webhook`
//! - `STRIPE_CURRENCY` - ISO currency for checkout sessions (default: inr)
//! - `EMAIL_USER` / `EMAIL_PASS` - SMTP credentials; enables order emails
//! - `SMTP_HOST` - SMTP relay (default: smtp.gmail.com)
//! - `SMTP_PORT` - SMTP port (default: 465)
//! - `ADMIN_EMAIL` - Receives new-order notifications
//! - `EMAILJS_SERVICE_ID`, `EMAILJS_PUBLIC_KEY`, `EMAILJS_PRIVATE_KEY` - EmailJS account
//! - `EMAILJS_TEMPLATE_AUTO_REPLY`, `EMAILJS_TEMPLATE_WELCOME` - EmailJS template ids
//! - `GEMINI_API_KEY` - Enables image keyword search
//! - `GEMINI_MODEL` - Model name (default: gemini-2.0-flash)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: `APP_ENV`)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: &str = "465";
const DEFAULT_EMAILJS_SERVICE_ID: &str = "service_4omzenc";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Deployment environment (`development`, `production`, ...)
    pub environment: String,
    /// Identity provider used to verify bearer tokens
    pub identity: IdentityConfig,
    /// Card payments; `None` disables `paymentMethod: STRIPE`
    pub stripe: Option<StripeConfig>,
    /// Transactional order emails
    pub smtp: Option<SmtpConfig>,
    /// Templated auto-reply and welcome emails
    pub emailjs: Option<EmailJsConfig>,
    /// Image keyword extraction
    pub gemini: Option<GeminiConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Identity provider (Firebase Authentication) configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Web API key passed to `accounts:lookup`
    pub api_key: SecretString,
    /// Base URL of the identity toolkit REST API
    pub api_base: String,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Stripe configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: Option<SecretString>,
    /// Lowercase ISO 4217 currency code
    pub currency: String,
    /// Base URL of the Stripe REST API
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SMTP configuration for order emails.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Login and `From` address
    pub username: String,
    pub password: SecretString,
    /// Recipient of new-order notifications
    pub admin_email: Option<String>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

/// EmailJS configuration.
#[derive(Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    /// Public key, sent as `user_id`
    pub public_key: String,
    /// Private key, sent as `accessToken` when present
    pub private_key: Option<SecretString>,
    pub auto_reply_template: Option<String>,
    pub welcome_template: Option<String>,
    /// Base URL of the EmailJS REST API
    pub api_base: String,
}

impl std::fmt::Debug for EmailJsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsConfig")
            .field("service_id", &self.service_id)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("auto_reply_template", &self.auto_reply_template)
            .field("welcome_template", &self.welcome_template)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Gemini (generative language API) configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    /// Base URL of the generative language REST API
    pub api_base: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let environment = get_env_or_default("APP_ENV", "development");

        let sentry_environment =
            get_optional_env("SENTRY_ENVIRONMENT").or_else(|| Some(environment.clone()));

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity: IdentityConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            emailjs: EmailJsConfig::from_env(),
            gemini: GeminiConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: if environment == "production" {
                0.1
            } else {
                1.0
            },
            environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// First characters of the database URL, safe to show in diagnostics.
    #[must_use]
    pub fn database_url_prefix(&self) -> String {
        let url = self.database_url.expose_secret();
        let prefix: String = url.chars().take(20).collect();
        format!("{prefix}...")
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_required_secret("FIREBASE_API_KEY")?,
            api_base: get_env_or_default(
                "FIREBASE_API_BASE",
                "https://identitytoolkit.googleapis.com",
            ),
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = get_optional_env("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&secret_key, "STRIPE_SECRET_KEY")?;

        let webhook_secret = get_optional_env("STRIPE_WEBHOOK_SECRET")
            .map(|value| {
                validate_secret_strength(&value, "STRIPE_WEBHOOK_SECRET")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            webhook_secret,
            currency: get_env_or_default("STRIPE_CURRENCY", "inr").to_lowercase(),
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
        }))
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(username), Some(password)) =
            (get_optional_env("EMAIL_USER"), get_optional_env("EMAIL_PASS"))
        else {
            return Ok(None);
        };
        let port = get_env_or_default("SMTP_PORT", DEFAULT_SMTP_PORT)
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            host: get_env_or_default("SMTP_HOST", DEFAULT_SMTP_HOST),
            port,
            username,
            password: SecretString::from(password),
            admin_email: get_optional_env("ADMIN_EMAIL"),
        }))
    }
}

impl EmailJsConfig {
    fn from_env() -> Option<Self> {
        let public_key = get_optional_env("EMAILJS_PUBLIC_KEY")?;
        Some(Self {
            service_id: get_env_or_default("EMAILJS_SERVICE_ID", DEFAULT_EMAILJS_SERVICE_ID),
            public_key,
            private_key: get_optional_env("EMAILJS_PRIVATE_KEY").map(SecretString::from),
            auto_reply_template: get_optional_env("EMAILJS_TEMPLATE_AUTO_REPLY"),
            welcome_template: get_optional_env("EMAILJS_TEMPLATE_WELCOME"),
            api_base: get_env_or_default("EMAILJS_API_BASE", "https://api.emailjs.com"),
        })
    }
}

impl GeminiConfig {
    fn from_env() -> Option<Self> {
        let api_key = get_optional_env("GEMINI_API_KEY")?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            api_base: get_env_or_default(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Some(value) = get_optional_env(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Some(value) = get_optional_env("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Config with every optional integration disabled.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://qui:pw@localhost/qui_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            identity: IdentityConfig {
                api_key: SecretString::from("AIzaSyTestKey"),
                api_base: "http://127.0.0.1:9".to_string(),
            },
            stripe: None,
            smtp: None,
            emailjs: None,
            gemini: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("sk_test_your-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaa", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_real_looking_key() {
        let result = validate_secret_strength(
            "sk_test_51HxQ2bK8vLmN3pR7tY9wZ4cF6gJ0",
            "STRIPE_SECRET_KEY",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_database_url_prefix_hides_credentials_tail() {
        let prefix = test_config().database_url_prefix();
        assert_eq!(prefix, "postgres://qui:pw@lo...");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let stripe = StripeConfig {
            secret_key: SecretString::from("sk_live_super_secret_value"),
            webhook_secret: Some(SecretString::from("whsec_super_secret_hook")),
            currency: "inr".to_string(),
            api_base: "https://api.stripe.com".to_string(),
        };
        let smtp = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: "orders@qui.test".to_string(),
            password: SecretString::from("smtp_super_secret_pass"),
            admin_email: None,
        };

        let debug_output = format!("{stripe:?} {smtp:?} {:?}", test_config());

        assert!(debug_output.contains("inr"));
        assert!(debug_output.contains("orders@qui.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret"));
        assert!(!debug_output.contains("AIzaSyTestKey"));
    }
}
