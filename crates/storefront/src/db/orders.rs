//! Order repository.
//!
//! Orders are written inside the checkout transaction and read back as
//! [`OrderView`]s with items, products, address and customer resolved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use qui_core::{AddressId, OrderId, PaymentMethod, ProductId, StoreId, UserId};

use super::{AddressRepository, ProductRepository, RepositoryError, UserRepository, parse_column};
use crate::models::{Order, OrderItem, OrderItemView, OrderView, ShippingAddress, UserSummary};

const ORDER_COLUMNS: &str = "id, user_id, store_id, address_id, total, shipping_fee, status, \
                             payment_method, is_paid, is_coupon_used, coupon, shipping_address, \
                             is_guest, guest_name, guest_email, guest_phone, awb_number, courier, \
                             created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<String>,
    store_id: Uuid,
    address_id: Option<Uuid>,
    total: Decimal,
    shipping_fee: Decimal,
    status: String,
    payment_method: String,
    is_paid: bool,
    is_coupon_used: bool,
    coupon: serde_json::Value,
    shipping_address: Option<Json<ShippingAddress>>,
    is_guest: bool,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    awb_number: Option<String>,
    courier: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            store_id: StoreId::new(row.store_id),
            address_id: row.address_id.map(AddressId::new),
            total: row.total,
            shipping_fee: row.shipping_fee,
            status: parse_column(&row.status, "orders.status")?,
            payment_method: parse_column(&row.payment_method, "orders.payment_method")?,
            is_paid: row.is_paid,
            is_coupon_used: row.is_coupon_used,
            coupon: row.coupon,
            shipping_address: row.shipping_address.map(|a| a.0),
            is_guest: row.is_guest,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            guest_phone: row.guest_phone,
            awb_number: row.awb_number,
            courier: row.courier,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order_items.quantity: negative quantity {}",
                row.quantity
            ))
        })?;
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity,
            price: row.price,
        })
    }
}

/// Contact details recorded on a guest order.
#[derive(Debug, Clone)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// An order to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// `None` for guest orders.
    pub user_id: Option<UserId>,
    pub store_id: StoreId,
    pub address_id: Option<AddressId>,
    pub total: Decimal,
    pub shipping_fee: Decimal,
    pub payment_method: PaymentMethod,
    /// Coupon snapshot, `None` when no coupon was applied.
    pub coupon: Option<serde_json::Value>,
    pub shipping_address: Option<ShippingAddress>,
    pub guest: Option<GuestContact>,
    pub items: Vec<OrderItem>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order without resolving references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status column is unknown.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Get one order with items, address and customer resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_view(&self, id: OrderId) -> Result<Option<OrderView>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        Ok(self.populate(vec![order]).await?.pop())
    }

    /// Resolve several orders, in the order the ids were given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_views(&self, ids: &[OrderId]) -> Result<Vec<OrderView>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(OrderId::as_uuid).collect();
        let sql = format!("SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(uuids)
            .fetch_all(self.pool)
            .await?;

        let mut orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        orders.sort_by_key(|o| ids.iter().position(|id| *id == o.id));

        self.populate(orders).await
    }

    /// A customer's visible orders, newest first.
    ///
    /// Cash-on-delivery orders are always visible; card orders only once
    /// paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderView>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM storefront.orders
            WHERE user_id = $1
              AND (payment_method = 'COD' OR (payment_method = 'STRIPE' AND is_paid))
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        self.populate(orders).await
    }

    /// Whether the customer has placed any order before.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_has_orders(&self, user_id: &UserId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM storefront.orders WHERE user_id = $1)",
        )
        .bind(user_id.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether a guest with this email has placed any order before.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn guest_has_orders(&self, email: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.orders
                WHERE is_guest AND lower(guest_email) = lower($1)
            )
            ",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Mark card orders as paid. Returns the number of orders updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(&self, ids: &[OrderId]) -> Result<u64, RepositoryError> {
        let uuids: Vec<Uuid> = ids.iter().map(OrderId::as_uuid).collect();
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET is_paid = TRUE, updated_at = now()
            WHERE id = ANY($1) AND NOT is_paid
            ",
        )
        .bind(uuids)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete orders whose payment never completed.
    ///
    /// Paid orders in `ids` are kept. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_unpaid(&self, ids: &[OrderId]) -> Result<u64, RepositoryError> {
        let uuids: Vec<Uuid> = ids.iter().map(OrderId::as_uuid).collect();
        let result =
            sqlx::query("DELETE FROM storefront.orders WHERE id = ANY($1) AND NOT is_paid")
                .bind(uuids)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Resolve items, products, addresses and users for a batch of orders.
    async fn populate(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, quantity, price
            FROM storefront.order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = OrderId::new(row.order_id);
            items_by_order
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        let mut product_ids: Vec<ProductId> = items_by_order
            .values()
            .flatten()
            .map(|item| item.product_id)
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let products = ProductRepository::new(self.pool)
            .get_many(&product_ids)
            .await?;

        let address_ids: Vec<AddressId> = orders.iter().filter_map(|o| o.address_id).collect();
        let addresses: HashMap<AddressId, _> = AddressRepository::new(self.pool)
            .get_many(&address_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let user_ids: Vec<UserId> = orders.iter().filter_map(|o| o.user_id.clone()).collect();
        let users: HashMap<UserId, UserSummary> = UserRepository::new(self.pool)
            .get_many(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let order_items = items_by_order
                    .remove(&order.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| OrderItemView {
                        product: products.get(&item.product_id).cloned(),
                        item,
                    })
                    .collect();
                let address = order.address_id.and_then(|id| addresses.get(&id).cloned());
                let user = order.user_id.as_ref().and_then(|id| users.get(id).cloned());
                OrderView {
                    order,
                    order_items,
                    address,
                    user,
                }
            })
            .collect())
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Insert an order and its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails (including
    /// foreign key violations for unknown stores, products or addresses).
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let id = OrderId::generate();
        let (guest_name, guest_email, guest_phone) = order.guest.as_ref().map_or(
            (None, None, None),
            |g| (Some(&g.name), Some(&g.email), Some(&g.phone)),
        );

        sqlx::query(
            r"
            INSERT INTO storefront.orders (
                id, user_id, store_id, address_id, total, shipping_fee,
                payment_method, is_coupon_used, coupon, shipping_address,
                is_guest, guest_name, guest_email, guest_phone
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(id.as_uuid())
        .bind(order.user_id.as_ref().map(UserId::as_str))
        .bind(order.store_id.as_uuid())
        .bind(order.address_id.as_ref().map(AddressId::as_uuid))
        .bind(order.total)
        .bind(order.shipping_fee)
        .bind(order.payment_method.as_str())
        .bind(order.coupon.is_some())
        .bind(
            order
                .coupon
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
        )
        .bind(order.shipping_address.as_ref().map(Json))
        .bind(order.guest.is_some())
        .bind(guest_name)
        .bind(guest_email)
        .bind(guest_phone)
        .execute(&mut *conn)
        .await?;

        let mut line_nos: Vec<i16> = Vec::with_capacity(order.items.len());
        let mut product_ids: Vec<Uuid> = Vec::with_capacity(order.items.len());
        let mut quantities: Vec<i32> = Vec::with_capacity(order.items.len());
        let mut prices: Vec<Decimal> = Vec::with_capacity(order.items.len());
        for (line_no, item) in order.items.iter().enumerate() {
            line_nos.push(i16::try_from(line_no).map_err(|_| {
                RepositoryError::Conflict("too many lines in one order".to_owned())
            })?);
            product_ids.push(item.product_id.as_uuid());
            quantities.push(i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::Conflict(format!("quantity {} out of range", item.quantity))
            })?);
            prices.push(item.price);
        }

        sqlx::query(
            r"
            INSERT INTO storefront.order_items (order_id, line_no, product_id, quantity, price)
            SELECT $1, * FROM UNNEST($2::smallint[], $3::uuid[], $4::integer[], $5::numeric[])
            ",
        )
        .bind(id.as_uuid())
        .bind(line_nos)
        .bind(product_ids)
        .bind(quantities)
        .bind(prices)
        .execute(&mut *conn)
        .await?;

        Ok(id)
    }

    /// Attach a guest's orders to an account. Returns the number claimed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn claim_guest_orders(
        conn: &mut PgConnection,
        guest_email: &str,
        user_id: &UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET user_id = $2, updated_at = now()
            WHERE is_guest AND user_id IS NULL AND lower(guest_email) = lower($1)
            ",
        )
        .bind(guest_email)
        .bind(user_id.as_str())
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
