//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (web client origin)
//! 5. Security headers
//! 6. Rate limiting (governor), per route group
//!
//! Authentication is done by extractors rather than a layer, so each
//! handler states whether it needs a user.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{BearerToken, NOT_AUTHORIZED, OptionalUser, RequireUser};
pub use rate_limit::{api_rate_limiter, checkout_rate_limiter, image_search_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
