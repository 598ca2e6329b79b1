//! Qui Core - Shared types library.
//!
//! This crate provides the domain vocabulary used across the Qui workspace:
//! - `storefront` - Public JSON API for browsing, cart and checkout
//! - `cli` - Command-line tools for migrations, seeding and coupons
//!
//! # Architecture
//!
//! The core crate contains only types and pure business rules - no I/O, no
//! database access, no HTTP clients. Checkout arithmetic lives here so it can
//! be tested without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, money, statuses and coupons
//! - [`pricing`] - Coupon discounts and multi-seller order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use types::*;
