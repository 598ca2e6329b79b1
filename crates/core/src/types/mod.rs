//! Core types for Qui.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coupon;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use coupon::{CouponRejection, CouponRules, CouponTerms, DiscountType};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{round_money, to_minor_units};
pub use status::*;
