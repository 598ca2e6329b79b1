//! Order placement.
//!
//! A checkout is validated completely before anything is written:
//! customer details, order lines, coupon eligibility, products, address
//! and stores. The writes (user, address, guest record, one order per
//! seller, coupon usage) then commit in a single transaction. Emails and
//! the Stripe session are created only after the commit.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use qui_core::pricing::split_totals;
use qui_core::{
    AddressId, CouponRejection, Email, OrderId, PaymentMethod, ProductId, StoreId, UserId,
};

use crate::db::{
    AddressRepository, CouponRepository, GuestContact, GuestRepository, NewOrder,
    OrderRepository, ProductRepository, RepositoryError, StoreRepository, UserRepository,
};
use crate::models::guest::{convert_token_expiry, generate_convert_token};
use crate::models::{
    Address, AddressInput, Coupon, GuestUser, OrderItem, OrderView, Product, ShippingAddress,
};
use crate::services::identity::VerifiedUser;
use crate::services::payments::{CheckoutRequest, CheckoutSession, PaymentError};
use crate::state::AppState;

/// Defaults for guest address fields left blank.
const GUEST_CITY: &str = "Guest";
const GUEST_STATE: &str = "Guest";
const GUEST_ZIP: &str = "000000";
const GUEST_COUNTRY: &str = "UAE";

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("missing guest information")]
    MissingGuestInfo(Vec<&'static str>),
    #[error("invalid guest email")]
    InvalidGuestEmail,
    #[error("missing order details.")]
    MissingOrderDetails,
    /// Carries the offending product id.
    #[error("Invalid item quantity")]
    InvalidQuantity(String),
    #[error("Coupon not found")]
    CouponNotFound,
    #[error("{0}")]
    CouponRejected(#[from] CouponRejection),
    /// Carries the requested product id.
    #[error("Product not found")]
    ProductNotFound(String),
    #[error("Address not found")]
    AddressNotFound,
    #[error("Store not found")]
    StoreNotFound,
    #[error("Card payments are not configured")]
    PaymentsNotConfigured,
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl CheckoutError {
    /// Whether this is a failure on our side rather than a rejected request.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Payment(_))
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

/// One requested line: product id and quantity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderLineInput {
    pub id: String,
    pub quantity: i64,
}

/// Contact and address details for a guest checkout.
///
/// `address` and `street` are alternatives for the street line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub district: String,
}

impl GuestInfo {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.street_line()),
            ("city", self.city.as_str()),
            ("state", self.state.as_str()),
            ("country", self.country.as_str()),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        missing
    }

    /// The street line, from `address` or else `street`.
    #[must_use]
    pub fn street_line(&self) -> &str {
        if self.address.trim().is_empty() {
            &self.street
        } else {
            &self.address
        }
    }

    /// The address to ship to, if a street line was given.
    #[must_use]
    pub fn shipping_address(&self) -> Option<ShippingAddress> {
        let street = self.street_line().trim();
        if street.is_empty() {
            return None;
        }
        Some(ShippingAddress {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            street: street.to_string(),
            city: or_default(&self.city, GUEST_CITY),
            state: or_default(&self.state, GUEST_STATE),
            zip: or_default(&self.zip, GUEST_ZIP),
            country: or_default(&self.country, GUEST_COUNTRY),
            district: self.district.clone(),
        })
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() { default } else { value }.to_string()
}

/// Body of `POST /api/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderRequest {
    pub address_id: Option<String>,
    pub address_data: Option<AddressInput>,
    pub items: Vec<OrderLineInput>,
    pub coupon_code: Option<String>,
    pub payment_method: Option<String>,
    /// Only a literal `true` selects guest checkout.
    pub is_guest: Value,
    pub guest_info: Option<GuestInfo>,
    /// Non-numeric and negative values are treated as zero.
    pub shipping_fee: Value,
}

impl PlaceOrderRequest {
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.is_guest == Value::Bool(true)
    }

    /// The shipping fee, rounded to cents.
    #[must_use]
    pub fn shipping_fee(&self) -> Decimal {
        self.shipping_fee
            .as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .map_or(Decimal::ZERO, |d| d.round_dp(2).max(Decimal::ZERO))
    }

    fn coupon_code(&self) -> Option<&str> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    fn address_id(&self) -> Option<&str> {
        self.address_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Who is checking out.
#[derive(Debug, Clone)]
pub enum Customer {
    Member(VerifiedUser),
    Guest(GuestInfo),
}

impl Customer {
    #[must_use]
    pub fn is_plus_member(&self) -> bool {
        match self {
            Self::Member(user) => user.is_plus(),
            Self::Guest(_) => false,
        }
    }

    /// Whether this customer has ordered before. Guests are matched by email.
    async fn has_previous_orders(&self, orders: &OrderRepository<'_>) -> Result<bool, RepositoryError> {
        match self {
            Self::Member(user) => orders.user_has_orders(&user.uid).await,
            Self::Guest(info) => orders.guest_has_orders(info.email.trim()).await,
        }
    }
}

/// A checked request, ready to price.
#[derive(Debug)]
struct ValidatedOrder {
    payment_method: PaymentMethod,
    lines: Vec<(String, u32)>,
    shipping_fee: Decimal,
}

/// Shape checks that need no database access.
fn validate(request: &PlaceOrderRequest, customer: &Customer) -> Result<ValidatedOrder, CheckoutError> {
    if let Customer::Guest(info) = customer {
        let missing = info.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingGuestInfo(missing));
        }
        Email::parse(&info.email).map_err(|_| CheckoutError::InvalidGuestEmail)?;
    }

    let payment_method = request
        .payment_method
        .as_deref()
        .and_then(|m| m.parse::<PaymentMethod>().ok())
        .ok_or(CheckoutError::MissingOrderDetails)?;
    if request.items.is_empty() {
        return Err(CheckoutError::MissingOrderDetails);
    }

    let lines = request
        .items
        .iter()
        .map(|line| {
            u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q >= 1)
                .map(|q| (line.id.trim().to_string(), q))
                .ok_or_else(|| CheckoutError::InvalidQuantity(line.id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedOrder {
        payment_method,
        lines,
        shipping_fee: request.shipping_fee(),
    })
}

/// One seller's lines, priced at the current product price.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SellerGroup {
    store_id: StoreId,
    items: Vec<OrderItem>,
}

impl SellerGroup {
    fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}

/// Group lines by store, keeping the order in which stores first appear.
fn group_by_store(
    lines: &[(String, u32)],
    products: &HashMap<ProductId, Product>,
) -> Result<Vec<SellerGroup>, CheckoutError> {
    let mut groups: Vec<SellerGroup> = Vec::new();

    for (raw_id, quantity) in lines {
        let product = raw_id
            .parse::<ProductId>()
            .ok()
            .and_then(|id| products.get(&id))
            .ok_or_else(|| CheckoutError::ProductNotFound(raw_id.clone()))?;

        let item = OrderItem {
            product_id: product.id,
            quantity: *quantity,
            price: product.price,
        };

        match groups.iter_mut().find(|g| g.store_id == product.store_id) {
            Some(group) => group.items.push(item),
            None => groups.push(SellerGroup {
                store_id: product.store_id,
                items: vec![item],
            }),
        }
    }

    Ok(groups)
}

/// Look up a coupon and check the customer may use it.
///
/// # Errors
///
/// Returns `CheckoutError::CouponNotFound` for unknown or expired codes and
/// `CheckoutError::CouponRejected` when an eligibility rule fails.
pub async fn resolve_coupon(
    state: &AppState,
    code: &str,
    customer: &Customer,
) -> Result<Coupon, CheckoutError> {
    let coupon = CouponRepository::new(state.pool())
        .find_active(code, Utc::now())
        .await?
        .ok_or(CheckoutError::CouponNotFound)?;

    // Only ask for history when the rule needs it
    let has_previous_orders = if coupon.rules.for_new_user {
        customer
            .has_previous_orders(&OrderRepository::new(state.pool()))
            .await?
    } else {
        false
    };

    coupon
        .rules
        .check(has_previous_orders, customer.is_plus_member())?;
    Ok(coupon)
}

/// Where a member's order ships to.
enum MemberAddress {
    Saved(Address),
    New(ShippingAddress),
    Unspecified,
}

async fn resolve_member_address(
    state: &AppState,
    request: &PlaceOrderRequest,
    user_id: &UserId,
) -> Result<MemberAddress, CheckoutError> {
    if let Some(raw) = request.address_id() {
        let id: AddressId = raw.parse().map_err(|_| CheckoutError::AddressNotFound)?;
        let address = AddressRepository::new(state.pool())
            .get(id)
            .await?
            .filter(|a| &a.user_id == user_id)
            .ok_or(CheckoutError::AddressNotFound)?;
        return Ok(MemberAddress::Saved(address));
    }

    Ok(request
        .address_data
        .as_ref()
        .filter(|data| !data.street.trim().is_empty())
        .map_or(MemberAddress::Unspecified, |data| {
            MemberAddress::New(data.to_snapshot())
        }))
}

/// Result of a successful checkout.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Orders await card payment through this session.
    PaymentRequired(CheckoutSession),
    /// Orders placed, in seller order.
    Placed(Vec<OrderView>),
}

/// Place one order per seller.
///
/// # Errors
///
/// Returns a client-facing `CheckoutError` for invalid requests, or
/// `Database`/`Payment` when a dependency fails.
#[instrument(skip_all, fields(guest = matches!(customer, Customer::Guest(_))))]
pub async fn place_order(
    state: &AppState,
    customer: Customer,
    request: PlaceOrderRequest,
    origin: &str,
) -> Result<CheckoutOutcome, CheckoutError> {
    let validated = validate(&request, &customer)?;
    if validated.payment_method == PaymentMethod::Stripe && state.stripe().is_none() {
        return Err(CheckoutError::PaymentsNotConfigured);
    }

    let coupon = match request.coupon_code() {
        Some(code) => Some(resolve_coupon(state, code, &customer).await?),
        None => None,
    };

    let product_ids: Vec<ProductId> = validated
        .lines
        .iter()
        .filter_map(|(id, _)| id.parse().ok())
        .collect();
    let products = ProductRepository::new(state.pool())
        .get_many(&product_ids)
        .await?;
    let groups = group_by_store(&validated.lines, &products)?;

    let member_address = match &customer {
        Customer::Member(user) => resolve_member_address(state, &request, &user.uid).await?,
        Customer::Guest(_) => MemberAddress::Unspecified,
    };

    let stores = StoreRepository::new(state.pool());
    for group in &groups {
        if stores.get(group.store_id).await?.is_none() {
            return Err(CheckoutError::StoreNotFound);
        }
    }

    let subtotals: Vec<Decimal> = groups.iter().map(SellerGroup::subtotal).collect();
    let totals = split_totals(
        &subtotals,
        coupon.as_ref().map(|c| &c.terms),
        validated.shipping_fee,
        customer.is_plus_member(),
    );
    let coupon_snapshot = coupon
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(format!("coupon snapshot: {e}")))?;

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------
    let mut tx = state.pool().begin().await?;

    let (user_id, address_id, shipping_address, guest) = match &customer {
        Customer::Member(user) => {
            UserRepository::ensure_exists(
                &mut tx,
                &user.uid,
                user.name.as_deref().unwrap_or_default(),
                user.email.as_deref().unwrap_or_default(),
            )
            .await?;

            let (address_id, snapshot) = match member_address {
                MemberAddress::Saved(address) => (Some(address.id), Some(address.snapshot())),
                MemberAddress::New(snapshot) => {
                    let saved = AddressRepository::insert(&mut tx, &user.uid, &snapshot).await?;
                    (Some(saved.id), Some(snapshot))
                }
                MemberAddress::Unspecified => (None, None),
            };
            (Some(user.uid.clone()), address_id, snapshot, None)
        }
        Customer::Guest(info) => {
            UserRepository::ensure_guest(&mut tx).await?;

            let snapshot = info.shipping_address();
            let address_id = match &snapshot {
                Some(snapshot) => Some(
                    AddressRepository::insert(&mut tx, &UserId::guest(), snapshot)
                        .await?
                        .id,
                ),
                None => None,
            };

            let now = Utc::now();
            GuestRepository::upsert(
                &mut tx,
                &GuestUser {
                    email: info.email.trim().to_string(),
                    name: info.name.trim().to_string(),
                    phone: info.phone.trim().to_string(),
                    convert_token: generate_convert_token(),
                    token_expiry: convert_token_expiry(now),
                },
            )
            .await?;

            let contact = GuestContact {
                name: info.name.trim().to_string(),
                email: info.email.trim().to_string(),
                phone: info.phone.trim().to_string(),
            };
            (None, address_id, snapshot, Some(contact))
        }
    };

    let mut order_ids: Vec<OrderId> = Vec::with_capacity(groups.len());
    for (group, seller) in groups.into_iter().zip(&totals.sellers) {
        let order = NewOrder {
            user_id: user_id.clone(),
            store_id: group.store_id,
            address_id,
            total: seller.total,
            shipping_fee: seller.shipping,
            payment_method: validated.payment_method,
            coupon: coupon_snapshot.clone(),
            shipping_address: shipping_address.clone(),
            guest: guest.clone(),
            items: group.items,
        };
        order_ids.push(OrderRepository::insert(&mut tx, &order).await?);
    }

    if let Some(coupon) = &coupon {
        CouponRepository::increment_usage(&mut tx, &coupon.code).await?;
    }

    tx.commit().await?;

    info!(
        orders = order_ids.len(),
        full_amount = %totals.full_amount,
        payment_method = validated.payment_method.as_str(),
        "Orders placed"
    );

    // ---------------------------------------------------------------------
    // Side effects
    // ---------------------------------------------------------------------
    let views = OrderRepository::new(state.pool()).get_views(&order_ids).await?;

    let mut session = None;
    for step in post_commit_steps(validated.payment_method, user_id.is_some()) {
        match step {
            PostCommitStep::CreatePaymentSession => {
                let stripe = state.stripe().ok_or(CheckoutError::PaymentsNotConfigured)?;
                let created = stripe
                    .create_checkout_session(&CheckoutRequest {
                        amount: totals.full_amount,
                        origin,
                        order_ids: &order_ids,
                        user_id: user_id.as_ref(),
                    })
                    .await;

                match created {
                    Ok(created) => session = Some(created),
                    Err(err) => {
                        // Unpaid card orders have no use without a session
                        let removed = OrderRepository::new(state.pool())
                            .delete_unpaid(&order_ids)
                            .await;
                        if let Err(cleanup) = removed {
                            warn!(error = %cleanup, "Failed to remove orders after session error");
                        }
                        return Err(err.into());
                    }
                }
            }
            PostCommitStep::NotifyCustomer => {
                notify_order_placed(state, &customer, views.len()).await;
            }
            PostCommitStep::ClearCart => {
                if let Some(user_id) = &user_id
                    && let Err(err) = UserRepository::new(state.pool()).clear_cart(user_id).await
                {
                    warn!(error = %err, "Failed to clear cart after checkout");
                }
            }
        }
    }

    Ok(match session {
        Some(session) => CheckoutOutcome::PaymentRequired(session),
        None => CheckoutOutcome::Placed(views),
    })
}

/// Work done after the orders commit, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostCommitStep {
    CreatePaymentSession,
    NotifyCustomer,
    ClearCart,
}

/// Card orders email only once their payment session exists, since a
/// failed session deletes them. Carts are cleared by the payment webhook
/// for card orders, and right away otherwise.
fn post_commit_steps(method: PaymentMethod, is_member: bool) -> Vec<PostCommitStep> {
    match method {
        PaymentMethod::Stripe => vec![
            PostCommitStep::CreatePaymentSession,
            PostCommitStep::NotifyCustomer,
        ],
        PaymentMethod::Cod if is_member => {
            vec![PostCommitStep::NotifyCustomer, PostCommitStep::ClearCart]
        }
        PaymentMethod::Cod => vec![PostCommitStep::NotifyCustomer],
    }
}

/// Email the customer and the admin once per order. Failures are logged.
async fn notify_order_placed(state: &AppState, customer: &Customer, order_count: usize) {
    let Some(mailer) = state.mailer().cloned() else {
        tracing::debug!("SMTP not configured, skipping order emails");
        return;
    };

    let (email, name) = match customer {
        Customer::Guest(info) => (info.email.trim().to_string(), info.name.trim().to_string()),
        Customer::Member(user) => {
            let stored = UserRepository::new(state.pool())
                .get(&user.uid)
                .await
                .ok()
                .flatten();
            let email = stored
                .as_ref()
                .map(|u| u.email.clone())
                .filter(|e| !e.is_empty())
                .or_else(|| user.email.clone())
                .unwrap_or_default();
            let name = stored
                .map(|u| u.name)
                .filter(|n| !n.is_empty())
                .or_else(|| user.name.clone())
                .unwrap_or_default();
            (email, name)
        }
    };

    tokio::spawn(async move {
        for _ in 0..order_count {
            if !email.is_empty()
                && let Err(err) = mailer.send_order_confirmation(&email, &name).await
            {
                warn!(error = %err, "Failed to send order confirmation");
            }
            if let Err(err) = mailer.send_admin_notification(&name, &email).await {
                warn!(error = %err, "Failed to send admin order notification");
            }
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_card_orders_notify_only_after_session() {
        let steps = post_commit_steps(PaymentMethod::Stripe, true);
        assert_eq!(
            steps,
            [
                PostCommitStep::CreatePaymentSession,
                PostCommitStep::NotifyCustomer
            ]
        );
        assert!(!steps.contains(&PostCommitStep::ClearCart));
    }

    #[test]
    fn test_cash_orders_notify_and_clear_member_cart() {
        assert_eq!(
            post_commit_steps(PaymentMethod::Cod, true),
            [PostCommitStep::NotifyCustomer, PostCommitStep::ClearCart]
        );
        assert_eq!(
            post_commit_steps(PaymentMethod::Cod, false),
            [PostCommitStep::NotifyCustomer]
        );
    }

    fn guest_info() -> GuestInfo {
        GuestInfo {
            name: "Asha Rao".to_string(),
            email: "asha@qui.test".to_string(),
            phone: "+971500000000".to_string(),
            address: "12 Palm Road".to_string(),
            city: "Dubai".to_string(),
            state: "Dubai".to_string(),
            country: "UAE".to_string(),
            ..GuestInfo::default()
        }
    }

    fn member() -> Customer {
        Customer::Member(VerifiedUser {
            uid: UserId::new("uid_1"),
            email: Some("ada@qui.test".to_string()),
            name: Some("Ada".to_string()),
            plan: None,
        })
    }

    fn request(body: Value) -> PlaceOrderRequest {
        serde_json::from_value(body).unwrap()
    }

    fn product(store_id: StoreId, price: i64) -> Product {
        Product {
            id: ProductId::generate(),
            store_id,
            name: "Item".to_string(),
            slug: "item".to_string(),
            description: String::new(),
            mrp: Decimal::from(price),
            price: Decimal::from(price),
            images: vec![],
            category: String::new(),
            in_stock: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_guest_requires_all_contact_fields() {
        let info = GuestInfo {
            name: "Asha".to_string(),
            street: "  ".to_string(),
            ..GuestInfo::default()
        };
        assert_eq!(
            info.missing_fields(),
            ["email", "phone", "address", "city", "state", "country"]
        );
        assert!(guest_info().missing_fields().is_empty());
    }

    #[test]
    fn test_guest_street_accepted_in_place_of_address() {
        let info = GuestInfo {
            address: String::new(),
            street: "4 Creek Lane".to_string(),
            ..guest_info()
        };
        assert!(info.missing_fields().is_empty());
        assert_eq!(info.shipping_address().unwrap().street, "4 Creek Lane");
    }

    #[test]
    fn test_guest_shipping_address_defaults() {
        let address = guest_info().shipping_address().unwrap();
        assert_eq!(address.zip, "000000");
        assert_eq!(address.city, "Dubai");

        let blank = GuestInfo {
            country: String::new(),
            ..guest_info()
        };
        assert_eq!(blank.shipping_address().unwrap().country, "UAE");
    }

    #[test]
    fn test_validate_rejects_incomplete_guest() {
        let customer = Customer::Guest(GuestInfo {
            phone: String::new(),
            ..guest_info()
        });
        let req = request(json!({ "isGuest": true, "paymentMethod": "COD", "items": [] }));
        assert!(matches!(
            validate(&req, &customer),
            Err(CheckoutError::MissingGuestInfo(fields)) if fields == ["phone"]
        ));
    }

    #[test]
    fn test_validate_rejects_bad_guest_email() {
        let customer = Customer::Guest(GuestInfo {
            email: "not-an-email".to_string(),
            ..guest_info()
        });
        let req = request(json!({ "paymentMethod": "COD", "items": [{ "id": "x", "quantity": 1 }] }));
        assert!(matches!(
            validate(&req, &customer),
            Err(CheckoutError::InvalidGuestEmail)
        ));
    }

    #[test]
    fn test_validate_requires_payment_method_and_items() {
        let no_items = request(json!({ "paymentMethod": "COD", "items": [] }));
        assert!(matches!(
            validate(&no_items, &member()),
            Err(CheckoutError::MissingOrderDetails)
        ));

        let bad_method = request(json!({ "paymentMethod": "CHEQUE", "items": [{ "id": "a", "quantity": 1 }] }));
        assert!(matches!(
            validate(&bad_method, &member()),
            Err(CheckoutError::MissingOrderDetails)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let req = request(json!({ "paymentMethod": "COD", "items": [{ "id": "p1", "quantity": 0 }] }));
        assert!(matches!(
            validate(&req, &member()),
            Err(CheckoutError::InvalidQuantity(id)) if id == "p1"
        ));
    }

    #[test]
    fn test_shipping_fee_parsing() {
        assert_eq!(request(json!({ "shippingFee": 49.5 })).shipping_fee(), Decimal::new(495, 1));
        assert_eq!(request(json!({ "shippingFee": "49" })).shipping_fee(), Decimal::ZERO);
        assert_eq!(request(json!({})).shipping_fee(), Decimal::ZERO);
        assert_eq!(request(json!({ "shippingFee": -5 })).shipping_fee(), Decimal::ZERO);
    }

    #[test]
    fn test_is_guest_requires_literal_true() {
        assert!(request(json!({ "isGuest": true })).is_guest());
        assert!(!request(json!({ "isGuest": "true" })).is_guest());
        assert!(!request(json!({})).is_guest());
    }

    #[test]
    fn test_group_by_store_keeps_first_seen_order() {
        let store_a = StoreId::generate();
        let store_b = StoreId::generate();
        let shirt = product(store_b, 30);
        let hat = product(store_a, 10);
        let socks = product(store_b, 5);

        let lines = vec![
            (shirt.id.to_string(), 1),
            (hat.id.to_string(), 2),
            (socks.id.to_string(), 4),
        ];
        let products: HashMap<ProductId, Product> = [shirt.clone(), hat.clone(), socks]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let groups = group_by_store(&lines, &products).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].store_id, store_b);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].subtotal(), Decimal::from(50));
        assert_eq!(groups[1].store_id, store_a);
        assert_eq!(groups[1].subtotal(), Decimal::from(20));
    }

    #[test]
    fn test_group_by_store_reports_unknown_product() {
        let err = group_by_store(&[("not-a-uuid".to_string(), 1)], &HashMap::new()).unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == "not-a-uuid"));
    }

    #[test]
    fn test_plus_membership() {
        assert!(!member().is_plus_member());
        assert!(!Customer::Guest(guest_info()).is_plus_member());
        let plus = Customer::Member(VerifiedUser {
            uid: UserId::new("uid_2"),
            email: None,
            name: None,
            plan: Some("plus".to_string()),
        });
        assert!(plus.is_plus_member());
    }
}
