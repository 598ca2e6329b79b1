//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (database ping)
//!
//! # Catalog
//! GET  /api/products              - Search/filter (?search=&category=)
//! GET  /api/products/{id}         - Product detail
//! POST /api/search-by-image       - Photo to keyword (multipart `image`)
//!
//! # Orders
//! POST /api/orders                - Place orders (guest or bearer token)
//! GET  /api/orders                - ?orderId= lookup, or the caller's history
//! GET  /api/orders/{id}/awb       - Shipping label download
//! POST /api/awb                   - Shipping label from supplied details
//! POST /api/coupons/verify        - Coupon eligibility (auth)
//! POST /api/stripe/webhook        - Stripe checkout session events
//!
//! # Account (auth)
//! GET  /api/cart, PUT /api/cart
//! GET  /api/wishlist, POST /api/wishlist
//! GET  /api/addresses, POST /api/addresses
//! POST /api/guest/convert         - Claim guest orders with a convert token
//!
//! # Email
//! POST /api/send-welcome-email    - Welcome email (auth)
//! POST /api/contact/auto-reply    - Contact form acknowledgement
//!
//! # Diagnostics
//! GET  /api/debug/database
//! ```

pub mod account;
pub mod coupons;
pub mod diagnostics;
pub mod email;
pub mod image_search;
pub mod orders;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::StorefrontConfig;
use crate::middleware::{
    api_rate_limiter, checkout_rate_limiter, image_search_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Routes sharing the checkout limiter: order placement, coupon checks
/// and the contact form.
fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::create))
        .route("/coupons/verify", post(coupons::verify))
        .route("/contact/auto-reply", post(email::send_auto_reply))
        .layer(checkout_rate_limiter())
}

/// Photo search, with its own limiter and a larger body limit.
fn image_search_routes() -> Router<AppState> {
    Router::new()
        .route("/search-by-image", post(image_search::search_by_image))
        .layer(image_search_rate_limiter())
        .layer(DefaultBodyLimit::max(image_search::MAX_IMAGE_BYTES))
}

/// Create the `/api` routes. Per-route rate limits are applied here.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}/awb", get(orders::awb))
        .route("/awb", post(orders::render_awb))
        .route("/stripe/webhook", post(webhooks::stripe))
        // Account
        .route("/cart", get(account::get_cart).put(account::put_cart))
        .route(
            "/wishlist",
            get(account::get_wishlist).post(account::update_wishlist),
        )
        .route(
            "/addresses",
            get(account::list_addresses).post(account::create_address),
        )
        .route("/guest/convert", post(account::convert_guest))
        // Email
        .route("/send-welcome-email", post(email::send_welcome))
        // Diagnostics
        .route("/debug/database", get(diagnostics::database))
        .merge(checkout_routes())
        .merge(image_search_routes())
}

/// CORS for the web client served from `base_url`.
fn cors_layer(config: &StorefrontConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    match HeaderValue::from_str(config.base_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, "STOREFRONT_BASE_URL is not a valid origin, CORS disabled");
            layer
        }
    }
}

/// Build the full application with middleware and state.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    Router::new()
        .route("/health", get(diagnostics::health))
        .route("/health/ready", get(diagnostics::readiness))
        .nest("/api", api_routes().layer(api_rate_limiter()))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
