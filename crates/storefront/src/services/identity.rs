//! Bearer-token verification against the identity provider.
//!
//! Sign-in (phone, email, Google) happens in the browser against Firebase
//! Authentication. The storefront only receives the resulting ID token and
//! resolves it through the `accounts:lookup` REST endpoint. Verified tokens
//! are cached for 5 minutes, keyed by a SHA-256 digest of the token.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

use qui_core::UserId;

use crate::config::IdentityConfig;

/// Plan claim value that marks a plus member.
pub const PLUS_PLAN: &str = "plus";

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the token (expired, revoked, malformed).
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The provider returned an unexpected error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A user whose bearer token has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub plan: Option<String>,
}

impl VerifiedUser {
    /// Whether the `plan` custom claim is `plus`.
    #[must_use]
    pub fn is_plus(&self) -> bool {
        self.plan.as_deref() == Some(PLUS_PLAN)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    /// JSON-encoded custom claims, e.g. `{"plan":"plus"}`.
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomClaims {
    plan: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<LookupUser> for VerifiedUser {
    fn from(user: LookupUser) -> Self {
        let plan = user
            .custom_attributes
            .as_deref()
            .and_then(|raw| serde_json::from_str::<CustomClaims>(raw).ok())
            .and_then(|claims| claims.plan);

        Self {
            uid: UserId::new(user.local_id),
            email: user.email.filter(|e| !e.is_empty()),
            name: user.display_name.filter(|n| !n.is_empty()),
            plan,
        }
    }
}

/// Client for the identity provider's account lookup API.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    cache: Cache<String, VerifiedUser>,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                endpoint: format!(
                    "{}/v1/accounts:lookup",
                    config.api_base.trim_end_matches('/')
                ),
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    /// Verify a bearer token and return the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the provider rejects the token,
    /// or another variant if the provider cannot be reached.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<VerifiedUser, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::InvalidToken("empty token".to_string()));
        }

        let cache_key = token_digest(token);
        if let Some(user) = self.inner.cache.get(&cache_key).await {
            debug!(uid = %user.uid, "Cache hit for verified token");
            return Ok(user);
        }

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);

            // The lookup endpoint answers 400 for every kind of bad token
            if status == reqwest::StatusCode::BAD_REQUEST {
                return Err(IdentityError::InvalidToken(message));
            }
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .map(VerifiedUser::from)
            .ok_or_else(|| IdentityError::InvalidToken("no user for token".to_string()))?;

        debug!(uid = %user.uid, plan = ?user.plan, "Verified bearer token");
        self.inner.cache.insert(cache_key, user.clone()).await;

        Ok(user)
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup_user(custom_attributes: Option<&str>) -> LookupUser {
        LookupUser {
            local_id: "uid_123".to_string(),
            email: Some("ada@qui.test".to_string()),
            display_name: Some(String::new()),
            custom_attributes: custom_attributes.map(String::from),
        }
    }

    #[test]
    fn test_plan_read_from_custom_attributes() {
        let user = VerifiedUser::from(lookup_user(Some(r#"{"plan":"plus"}"#)));
        assert_eq!(user.uid.as_str(), "uid_123");
        assert!(user.is_plus());
        assert_eq!(user.name, None);
    }

    #[test]
    fn test_missing_or_malformed_claims_are_not_plus() {
        assert!(!VerifiedUser::from(lookup_user(None)).is_plus());
        assert!(!VerifiedUser::from(lookup_user(Some("not json"))).is_plus());
        assert!(!VerifiedUser::from(lookup_user(Some(r#"{"plan":"free"}"#))).is_plus());
    }

    #[test]
    fn test_lookup_response_parses() {
        let json = r#"{
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": "abc",
                "email": "a@b.co",
                "displayName": "Ada",
                "customAttributes": "{\"plan\":\"plus\"}"
            }]
        }"#;
        let response: LookupResponse = serde_json::from_str(json).unwrap();
        let user = VerifiedUser::from(response.users.into_iter().next().unwrap());
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert!(user.is_plus());
    }

    #[test]
    fn test_token_digest_is_stable_and_opaque() {
        let digest = token_digest("secret-token");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, token_digest("secret-token"));
        assert!(!digest.contains("secret"));
    }

    #[tokio::test]
    async fn test_empty_token_rejected_without_network() {
        let client = IdentityClient::new(&crate::config::tests::test_config().identity).unwrap();
        let err = client.verify("   ").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }
}
