//! Domain models for storefront.
//!
//! These are the validated shapes handlers work with and serialize to
//! clients (camelCase JSON). Database row types live next to their
//! queries in [`crate::db`].

pub mod address;
pub mod catalog;
pub mod coupon;
pub mod guest;
pub mod order;
pub mod user;

pub use address::{Address, AddressInput, ShippingAddress};
pub use catalog::{Product, ProductSummary, Store};
pub use coupon::Coupon;
pub use guest::GuestUser;
pub use order::{Order, OrderItem, OrderItemView, OrderView};
pub use user::{Cart, User, UserSummary};
