//! Order route handlers: placement, lookup, history and shipping labels.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, ORIGIN},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use qui_core::OrderId;

use crate::db::{OrderRepository, StoreRepository};
use crate::error::{AppError, Result, add_breadcrumb, set_sentry_user};
use crate::middleware::BearerToken;
use crate::services::awb::AwbDetails;
use crate::services::checkout::{
    CheckoutError, CheckoutOutcome, Customer, PlaceOrderRequest, place_order,
};
use crate::state::AppState;

pub const ORDERS_PLACED: &str = "Orders Placed Successfully";

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Work out who is ordering: a guest, or the bearer of a valid token.
async fn resolve_customer(
    state: &AppState,
    request: &PlaceOrderRequest,
    token: &BearerToken,
    headers: &HeaderMap,
) -> Result<Customer> {
    if request.is_guest() {
        let info = request
            .guest_info
            .clone()
            .ok_or_else(|| CheckoutError::MissingGuestInfo(vec!["guestInfo"]))?;
        return Ok(Customer::Guest(info));
    }

    let Some(raw) = token.0.as_deref() else {
        return Err(AppError::rejected(
            StatusCode::UNAUTHORIZED,
            "Authentication required for non-guest orders",
            json!({
                "isGuest": request.is_guest,
                "hasAuthHeader": headers.contains_key(AUTHORIZATION),
            }),
        ));
    };

    let user = state.identity().verify(raw).await.map_err(|e| {
        debug!(error = %e, "Checkout token rejected");
        AppError::Unauthorized("Token verification failed".to_string())
    })?;
    set_sentry_user(&user.uid, user.email.as_deref());
    Ok(Customer::Member(user))
}

/// Base URL for Stripe redirects: the caller's `Origin`, else our own.
fn redirect_origin(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|o| o.starts_with("http://") || o.starts_with("https://"))
        .map_or_else(
            || state.config().base_url.clone(),
            |o| o.trim_end_matches('/').to_string(),
        )
}

/// Place orders, one per seller.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    token: BearerToken,
    headers: HeaderMap,
    payload: std::result::Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let customer = resolve_customer(&state, &request, &token, &headers).await?;
    let is_guest = matches!(customer, Customer::Guest(_));
    let origin = redirect_origin(&state, &headers);

    let outcome = place_order(&state, customer, request, &origin).await?;

    let body = match outcome {
        CheckoutOutcome::PaymentRequired(session) => {
            add_breadcrumb("checkout", "Stripe session created", Some(&[("session", session.id.as_str())]));
            json!({ "session": session })
        }
        CheckoutOutcome::Placed(orders) => {
            add_breadcrumb("checkout", "Orders placed", None);
            if is_guest {
                let id = orders.first().map(|o| o.order.id.to_string());
                json!({ "message": ORDERS_PLACED, "orders": orders, "id": id })
            } else {
                let order = orders.last();
                let id = order.map(|o| o.order.id.to_string());
                json!({ "message": ORDERS_PLACED, "order": order, "id": id })
            }
        }
    };

    Ok(Json(body).into_response())
}

/// Query parameters for `GET /api/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub order_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Fetch one order by id (public), or list the caller's orders.
#[instrument(skip(state, token))]
pub async fn index(
    State(state): State<AppState>,
    token: BearerToken,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    let orders = OrderRepository::new(state.pool());

    if let Some(raw) = query.order_id.as_deref().filter(|id| !id.trim().is_empty()) {
        let id: OrderId = raw
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid order ID".to_string()))?;
        let order = orders
            .get_view(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        return Ok(Json(json!({ "order": order })).into_response());
    }

    let user = token.verify(&state).await?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let list = orders.list_for_user(&user.uid, limit, offset).await?;
    Ok(Json(json!({ "orders": list })).into_response())
}

/// Download the shipping label for an order.
#[instrument(skip(state))]
pub async fn awb(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order ID".to_string()))?;
    let view = OrderRepository::new(state.pool())
        .get_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    let store = StoreRepository::new(state.pool())
        .get(view.order.store_id)
        .await?;

    label_response(&AwbDetails::from_order(&view, store.as_ref()))
}

/// Render a label from client-supplied details.
#[instrument(skip_all)]
pub async fn render_awb(
    payload: std::result::Result<Json<AwbDetails>, JsonRejection>,
) -> Result<Response> {
    let Json(details) = payload?;
    label_response(&details)
}

fn label_response(details: &AwbDetails) -> Result<Response> {
    let html = details
        .render()
        .map_err(|e| AppError::Internal(format!("AWB render failed: {e}")))?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        details.file_name().replace(['"', '\\'], "")
    ))
    .map_err(|e| AppError::Internal(format!("AWB file name: {e}")))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (CONTENT_DISPOSITION, disposition),
        ],
        html,
    )
        .into_response())
}
