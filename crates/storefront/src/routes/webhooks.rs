//! Stripe webhook receiver.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::services::payments::WebhookEvent;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

const SESSION_COMPLETED: &str = "checkout.session.completed";
const SESSION_EXPIRED: &str = "checkout.session.expired";

#[derive(Debug, Serialize)]
pub struct Received {
    pub received: bool,
}

/// Settle or discard card orders as their checkout sessions finish.
///
/// Sessions created by other apps on the same Stripe account are
/// acknowledged without effect.
#[instrument(skip_all)]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Received>> {
    let stripe = state
        .stripe()
        .filter(|s| s.has_webhook_secret())
        .ok_or_else(|| AppError::ServiceUnavailable("Stripe webhooks are not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;
    stripe.verify_webhook(&body, signature).map_err(|e| {
        warn!(error = %e, "Rejected webhook delivery");
        AppError::BadRequest("Invalid signature".to_string())
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {e}")))?;

    if event.event_type != SESSION_COMPLETED && event.event_type != SESSION_EXPIRED {
        return Ok(Json(Received { received: true }));
    }

    let session = event
        .checkout_session()
        .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {e}")))?;
    if !session.is_ours() {
        return Ok(Json(Received { received: true }));
    }

    let order_ids = session.order_ids();
    let orders = OrderRepository::new(state.pool());

    if event.event_type == SESSION_COMPLETED {
        let paid = orders.mark_paid(&order_ids).await?;
        if let Some(user_id) = session.user_id() {
            UserRepository::new(state.pool()).clear_cart(&user_id).await?;
        }
        info!(event_id = %event.id, session_id = %session.id, paid, "Checkout session completed");
    } else {
        let removed = orders.delete_unpaid(&order_ids).await?;
        info!(event_id = %event.id, session_id = %session.id, removed, "Checkout session expired");
    }

    Ok(Json(Received { received: true }))
}
