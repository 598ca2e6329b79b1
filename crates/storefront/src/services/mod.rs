//! Business logic and third-party integrations for storefront.
//!
//! # Services
//!
//! - `checkout` - Multi-seller order placement
//! - `identity` - Bearer token verification against the identity provider
//! - `payments` - Stripe checkout sessions and webhook signatures
//! - `email` - SMTP order confirmations and admin notifications
//! - `emailjs` - Templated auto-reply and welcome emails
//! - `gemini` - Product keyword extraction from photos
//! - `awb` - Printable air waybill labels

pub mod awb;
pub mod checkout;
pub mod email;
pub mod emailjs;
pub mod gemini;
pub mod identity;
pub mod payments;
