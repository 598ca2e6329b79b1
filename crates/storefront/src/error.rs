//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON: `{"error": "<message>", ...details}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::emailjs::EmailJsError;
use crate::services::gemini::GeminiError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order placement was rejected or failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Stripe operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Image keyword extraction failed.
    #[error("Gemini error: {0}")]
    Gemini(#[from] GeminiError),

    /// Templated email delivery failed.
    #[error("EmailJS error: {0}")]
    EmailJs(#[from] EmailJsError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Client error carrying extra fields for the response body.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        message: String,
        details: Map<String, Value>,
    },

    /// An optional integration is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A client error whose body carries `details` next to `error`.
    ///
    /// Non-object `details` are ignored.
    #[must_use]
    pub fn rejected(status: StatusCode, message: impl Into<String>, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::Rejected {
            status,
            message: message.into(),
            details,
        }
    }

    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_)
            | Self::Internal(_)
            | Self::Payment(_)
            | Self::Gemini(_)
            | Self::EmailJs(_) => true,
            Self::Checkout(err) => err.is_server_error(),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) | Self::Gemini(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Payment(_) | Self::EmailJs(_) => StatusCode::BAD_GATEWAY,
            Self::Checkout(err) => match err {
                CheckoutError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Payment(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::PaymentsNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message and extra body fields shown to the client.
    fn client_body(&self) -> (String, Map<String, Value>) {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => ("Internal server error".to_string(), Map::new()),
            Self::Payment(_) => ("Payment provider error".to_string(), Map::new()),
            Self::Gemini(_) => ("Image search failed".to_string(), Map::new()),
            Self::EmailJs(_) => ("Failed to send email".to_string(), Map::new()),
            Self::Checkout(err) => checkout_body(err),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::ServiceUnavailable(msg) => (msg.clone(), Map::new()),
            Self::Rejected {
                message, details, ..
            } => (message.clone(), details.clone()),
            Self::RateLimited => ("Too many requests".to_string(), Map::new()),
        }
    }
}

fn checkout_body(err: &CheckoutError) -> (String, Map<String, Value>) {
    let details = match err {
        CheckoutError::MissingGuestInfo(fields) => json!({ "missingFields": fields }),
        CheckoutError::ProductNotFound(id) | CheckoutError::InvalidQuantity(id) => {
            json!({ "id": id })
        }
        _ => Value::Null,
    };
    let details = match details {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let message = match err {
        CheckoutError::Database(_) => "Internal server error".to_string(),
        CheckoutError::Payment(_) => "Payment provider error".to_string(),
        other => other.to_string(),
    };
    (message, details)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let (message, mut body) = self.client_body();
        body.insert("error".to_string(), Value::String(message));

        (status, Json(Value::Object(body))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Orders placed", Some(&[("orders", "2")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::PaymentsNotConfigured)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::CouponNotFound)),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_body_is_json_with_error_field() {
        let (status, body) = body_json(AppError::NotFound("Order not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Order not found" }));
    }

    #[tokio::test]
    async fn test_rejected_merges_details() {
        let err = AppError::rejected(
            StatusCode::UNAUTHORIZED,
            "Authentication required for non-guest orders",
            json!({ "isGuest": false, "hasAuthHeader": false }),
        );
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required for non-guest orders");
        assert_eq!(body["hasAuthHeader"], false);
    }

    #[tokio::test]
    async fn test_checkout_missing_fields_listed() {
        let err = AppError::Checkout(CheckoutError::MissingGuestInfo(vec!["email", "city"]));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing guest information");
        assert_eq!(body["missingFields"], json!(["email", "city"]));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("orders.status: LOST".into()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
