//! Stripe hosted checkout.
//!
//! Sessions are created through the form-encoded REST API with the secret
//! key as a bearer token. Webhook deliveries are authenticated with the
//! `Stripe-Signature` header: `t=<unix seconds>,v1=<hex hmac>` where the
//! HMAC-SHA256 covers `"{t}.{raw body}"`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, instrument};

use qui_core::{OrderId, UserId, to_minor_units};

use crate::config::StripeConfig;

/// Metadata tag identifying sessions created by this storefront.
pub const APP_ID: &str = "Qui";

/// How long a hosted checkout stays open.
const SESSION_TTL_MINUTES: i64 = 30;

/// Maximum accepted age of a webhook signature.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when creating a checkout session.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Amount cannot be charged.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),
}

/// Errors from webhook signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("signature does not match payload")]
    SignatureMismatch,
    #[error("signature timestamp outside tolerance")]
    Stale,
}

/// A Stripe checkout session, as returned by the API and relayed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Whether the session was created by this storefront.
    #[must_use]
    pub fn is_ours(&self) -> bool {
        self.metadata.get("appId").is_some_and(|id| id == APP_ID)
    }

    /// Orders listed in the `orderIds` metadata. Unparseable ids are skipped.
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.metadata
            .get("orderIds")
            .map(|ids| {
                ids.split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The user recorded in metadata, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.metadata
            .get("userId")
            .filter(|id| !id.is_empty())
            .map(UserId::new)
    }
}

/// A webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    /// The event's subject. Only checkout session events are decoded further.
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode the event subject as a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is not a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSession, serde_json::Error> {
        CheckoutSession::deserialize(&self.data.object)
    }
}

/// Parameters for a new checkout session.
#[derive(Debug)]
pub struct CheckoutRequest<'a> {
    /// Amount to charge in the store currency's major unit.
    pub amount: Decimal,
    /// Browser origin used for the success and cancel URLs.
    pub origin: &'a str,
    pub order_ids: &'a [OrderId],
    pub user_id: Option<&'a UserId>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    webhook_secret: Option<SecretString>,
    currency: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
                webhook_secret: config.webhook_secret.clone(),
                currency: config.currency.clone(),
            }),
        })
    }

    /// Whether webhook deliveries can be verified.
    #[must_use]
    pub fn has_webhook_secret(&self) -> bool {
        self.inner.webhook_secret.is_some()
    }

    /// Create a hosted checkout session for one or more orders.
    ///
    /// The whole amount is charged as a single `Order` line item.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for non-positive amounts, or
    /// another variant if the Stripe request fails.
    #[instrument(skip(self, request), fields(amount = %request.amount, orders = request.order_ids.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(request, &self.inner.currency, Utc::now())?;

        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }

    /// Verify a webhook delivery against the configured signing secret.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::SignatureMismatch` when no secret is configured.
    pub fn verify_webhook(&self, payload: &[u8], header: &str) -> Result<(), WebhookError> {
        let secret = self
            .inner
            .webhook_secret
            .as_ref()
            .ok_or(WebhookError::SignatureMismatch)?;
        verify_signature(payload, header, secret.expose_secret(), Utc::now().timestamp())
    }
}

/// Build the form-encoded body for `POST /v1/checkout/sessions`.
fn checkout_form(
    request: &CheckoutRequest<'_>,
    currency: &str,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>, PaymentError> {
    let unit_amount = to_minor_units(request.amount)
        .filter(|minor| *minor > 0)
        .ok_or(PaymentError::InvalidAmount(request.amount))?;

    let origin = request.origin.trim_end_matches('/');
    let order_ids = request
        .order_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let expires_at = now + chrono::Duration::minutes(SESSION_TTL_MINUTES);

    let pairs = [
        ("mode", "payment".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", currency.to_string()),
        ("line_items[0][price_data][product_data][name]", "Order".to_string()),
        ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
        ("expires_at", expires_at.timestamp().to_string()),
        ("success_url", format!("{origin}/loading?nextUrl=orders")),
        ("cancel_url", format!("{origin}/cart")),
        ("metadata[orderIds]", order_ids),
        (
            "metadata[userId]",
            request.user_id.map(UserId::to_string).unwrap_or_default(),
        ),
        ("metadata[appId]", APP_ID.to_string()),
    ];

    Ok(pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect())
}

/// Verify a `Stripe-Signature` header.
///
/// Any `v1` entry may match; Stripe sends several while a secret is rolled.
///
/// # Errors
///
/// Returns a `WebhookError` describing why the delivery was rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::Stale);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return Err(WebhookError::SignatureMismatch);
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice compares in constant time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::SignatureMismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_700_000_000);
        assert_eq!(verify_signature(payload, &header, SECRET, 1_700_000_100), Ok(()));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign(br#"{"id":"evt_1"}"#, 1_700_000_000);
        assert_eq!(
            verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, 1_700_000_000),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000);
        assert_eq!(
            verify_signature(payload, &header, "whsec_other", 1_700_000_000),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_signature_rejected() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000);
        assert_eq!(
            verify_signature(payload, &header, SECRET, 1_700_000_000 + 301),
            Err(WebhookError::Stale)
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert_eq!(
            verify_signature(b"{}", "v1=abcd", SECRET, 0),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(b"{}", "t=100", SECRET, 100),
            Err(WebhookError::MalformedHeader)
        );
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let payload = b"{}";
        let valid = sign(payload, 1_700_000_000);
        let good_sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={good_sig}");
        assert_eq!(verify_signature(payload, &header, SECRET, 1_700_000_000), Ok(()));
    }

    #[test]
    fn test_checkout_form_fields() {
        let ids = [OrderId::generate(), OrderId::generate()];
        let user = UserId::new("uid_1");
        let request = CheckoutRequest {
            amount: Decimal::new(12_345, 2),
            origin: "https://shop.qui.test/",
            order_ids: &ids,
            user_id: Some(&user),
        };
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let form: HashMap<String, String> =
            checkout_form(&request, "inr", now).unwrap().into_iter().collect();

        assert_eq!(form["line_items[0][price_data][unit_amount]"], "12345");
        assert_eq!(form["line_items[0][quantity]"], "1");
        assert_eq!(form["expires_at"], "1700001800");
        assert_eq!(form["success_url"], "https://shop.qui.test/loading?nextUrl=orders");
        assert_eq!(form["cancel_url"], "https://shop.qui.test/cart");
        assert_eq!(form["metadata[orderIds]"], format!("{},{}", ids[0], ids[1]));
        assert_eq!(form["metadata[userId]"], "uid_1");
        assert_eq!(form["metadata[appId]"], "Qui");
    }

    #[test]
    fn test_checkout_form_rejects_zero_amount() {
        let request = CheckoutRequest {
            amount: Decimal::ZERO,
            origin: "http://localhost:3000",
            order_ids: &[],
            user_id: None,
        };
        assert!(matches!(
            checkout_form(&request, "inr", Utc::now()),
            Err(PaymentError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_session_metadata_accessors() {
        let id = OrderId::generate();
        let json = serde_json::json!({
            "id": "cs_test_1",
            "metadata": { "orderIds": format!("{id},not-a-uuid"), "userId": "", "appId": "Qui" }
        });
        let session: CheckoutSession = serde_json::from_value(json).unwrap();
        assert!(session.is_ours());
        assert_eq!(session.order_ids(), vec![id]);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_webhook_event_decodes_session() {
        let json = r#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "metadata": { "appId": "Other" } } }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        let session = event.checkout_session().unwrap();
        assert!(!session.is_ours());
    }
}
