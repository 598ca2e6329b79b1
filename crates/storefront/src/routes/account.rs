//! Account route handlers: cart, wishlist, saved addresses and guest
//! order claiming.
//!
//! These routes require authentication.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use qui_core::ProductId;

use crate::db::{
    AddressRepository, GuestRepository, OrderRepository, RepositoryError, UserRepository,
    WishlistRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Address, AddressInput, Cart, Product};
use crate::state::AppState;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
}

/// Get the caller's cart.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn get_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartResponse>> {
    let cart = UserRepository::new(state.pool()).get_cart(&user.uid).await?;
    Ok(Json(CartResponse { cart }))
}

#[derive(Debug, Deserialize)]
pub struct CartUpdate {
    pub cart: Cart,
}

/// Replace the caller's cart. Zero quantities are dropped.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn put_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: JsonBody<CartUpdate>,
) -> Result<Json<CartResponse>> {
    let Json(update) = payload?;
    let cart = Cart::from_lines(update.cart.into_lines());

    UserRepository::new(state.pool())
        .set_cart(&user.uid, &cart)
        .await?;
    Ok(Json(CartResponse { cart }))
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub wishlist: Vec<Product>,
}

/// List the caller's wishlist.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn get_wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<WishlistResponse>> {
    let wishlist = WishlistRepository::new(state.pool()).list(&user.uid).await?;
    Ok(Json(WishlistResponse { wishlist }))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistUpdate {
    pub product_id: String,
    pub action: WishlistAction,
}

/// Add or remove a wishlist product, returning the updated list.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn update_wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: JsonBody<WishlistUpdate>,
) -> Result<Json<WishlistResponse>> {
    let Json(update) = payload?;
    let not_found = || AppError::NotFound("Product not found".to_string());
    let product_id: ProductId = update.product_id.trim().parse().map_err(|_| not_found())?;

    let repo = WishlistRepository::new(state.pool());
    match update.action {
        WishlistAction::Add => repo.add(&user.uid, product_id).await.map_err(|e| match e {
            RepositoryError::NotFound => not_found(),
            other => other.into(),
        })?,
        WishlistAction::Remove => repo.remove(&user.uid, product_id).await?,
    }

    let wishlist = repo.list(&user.uid).await?;
    Ok(Json(WishlistResponse { wishlist }))
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<Address>,
}

/// List the caller's saved addresses.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn list_addresses(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<AddressList>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(&user.uid)
        .await?;
    Ok(Json(AddressList { addresses }))
}

#[derive(Debug, Deserialize)]
pub struct AddressCreate {
    pub address: AddressInput,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub message: &'static str,
    pub address: Address,
}

/// Save a new address for the caller.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: JsonBody<AddressCreate>,
) -> Result<Json<AddressResponse>> {
    let Json(AddressCreate { address }) = payload?;

    let missing = address.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::rejected(
            StatusCode::BAD_REQUEST,
            "missing address details",
            json!({ "missingFields": missing }),
        ));
    }

    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;
    UserRepository::ensure_exists(
        &mut tx,
        &user.uid,
        user.name.as_deref().unwrap_or_default(),
        user.email.as_deref().unwrap_or_default(),
    )
    .await?;
    let saved = AddressRepository::insert(&mut tx, &user.uid, &address.to_snapshot()).await?;
    tx.commit().await.map_err(RepositoryError::from)?;

    Ok(Json(AddressResponse {
        message: "Address added successfully",
        address: saved,
    }))
}

// =============================================================================
// Guest conversion
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub message: &'static str,
    pub claimed_orders: u64,
}

/// Attach a guest's orders to the caller's account.
///
/// The token is single use; a used or expired token is rejected.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn convert_guest(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: JsonBody<ConvertRequest>,
) -> Result<Json<ConvertResponse>> {
    let Json(request) = payload?;
    let invalid = || AppError::BadRequest("Invalid or expired token".to_string());
    let token = request.token.trim();
    if token.is_empty() {
        return Err(invalid());
    }

    let guest = GuestRepository::new(state.pool())
        .find_by_token(token)
        .await?
        .filter(|g| g.token_is_valid(Utc::now()))
        .ok_or_else(invalid)?;

    let mut tx = state.pool().begin().await.map_err(RepositoryError::from)?;
    // Lost a race with another claim of the same token
    if !GuestRepository::consume_token(&mut tx, token).await? {
        return Err(invalid());
    }
    UserRepository::ensure_exists(
        &mut tx,
        &user.uid,
        &guest.name,
        user.email.as_deref().unwrap_or(&guest.email),
    )
    .await?;
    let claimed = OrderRepository::claim_guest_orders(&mut tx, &guest.email, &user.uid).await?;
    tx.commit().await.map_err(RepositoryError::from)?;

    info!(claimed, "Guest orders claimed");
    Ok(Json(ConvertResponse {
        message: "Guest orders linked to your account",
        claimed_orders: claimed,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header::CONTENT_TYPE},
        routing::{get, post},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;
    use crate::state::tests::test_state;

    fn app() -> Router {
        Router::new()
            .route("/api/cart", get(get_cart).put(put_cart))
            .route("/api/addresses", get(list_addresses).post(create_address))
            .route("/api/guest/convert", post(convert_guest))
            .with_state(test_state(test_config()))
    }

    #[tokio::test]
    async fn test_account_routes_require_token() {
        for (method, uri) in [
            ("GET", "/api/cart"),
            ("PUT", "/api/cart"),
            ("POST", "/api/addresses"),
            ("POST", "/api/guest/convert"),
        ] {
            let response = app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .header(CONTENT_TYPE, "application/json")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["error"], "not authorized");
        }
    }

    #[test]
    fn test_wishlist_action_parsing() {
        let update: WishlistUpdate =
            serde_json::from_value(json!({ "productId": "p", "action": "remove" })).unwrap();
        assert!(matches!(update.action, WishlistAction::Remove));
        assert!(serde_json::from_value::<WishlistUpdate>(json!({ "productId": "p", "action": "toggle" })).is_err());
    }
}
