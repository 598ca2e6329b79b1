//! Orders and their populated views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use qui_core::{AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, StoreId, UserId};

use super::{Address, Product, ShippingAddress, UserSummary};

/// One seller's share of a checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest orders.
    pub user_id: Option<UserId>,
    pub store_id: StoreId,
    pub address_id: Option<AddressId>,
    pub total: Decimal,
    pub shipping_fee: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub is_coupon_used: bool,
    /// Snapshot of the coupon applied at checkout, `{}` when none.
    pub coupon: serde_json::Value,
    pub shipping_address: Option<ShippingAddress>,
    pub is_guest: bool,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub awb_number: Option<String>,
    pub courier: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A line of an order, priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// An order line with its product resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    /// `None` if the product has since been deleted.
    pub product: Option<Product>,
}

/// An order with items, address and customer resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItemView>,
    pub address: Option<Address>,
    pub user: Option<UserSummary>,
}

impl OrderView {
    /// Address to ship to: the embedded snapshot, else the referenced address.
    #[must_use]
    pub fn ship_to(&self) -> Option<ShippingAddress> {
        self.order
            .shipping_address
            .clone()
            .or_else(|| self.address.as_ref().map(Address::snapshot))
    }

    /// Name of the customer who placed the order.
    #[must_use]
    pub fn customer_name(&self) -> String {
        if let Some(name) = self.order.guest_name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        if let Some(address) = &self.order.shipping_address {
            return address.name.clone();
        }
        self.user.as_ref().map(|u| u.name.clone()).unwrap_or_default()
    }
}
