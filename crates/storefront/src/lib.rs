//! Qui Storefront library.
//!
//! The JSON API behind the Qui marketplace web client: catalog search,
//! multi-seller checkout, card payments, order emails and shipping labels.
//! Exposed as a library so the binary and integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;
