//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `checkout_rate_limiter`: order placement and coupon checks (~12/min)
//! - `image_search_rate_limiter`: Gemini-backed image search (~6/min)
//! - `api_rate_limiter`: everything else under `/api` (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP headers set by the proxies in front of us, most trusted first.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor that reads the real client IP from proxy headers.
///
/// Checks the single-address headers first, then the first hop
/// of `X-Forwarded-For`, then the TCP peer for direct connections.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl ProxyIpKeyExtractor {
    fn from_headers(headers: &axum::http::HeaderMap) -> Option<IpAddr> {
        CLIENT_IP_HEADERS
            .iter()
            .find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse().ok())
            })
            .or_else(|| {
                headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse().ok())
            })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Self::from_headers(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_secs: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Order placement and coupon checks: 1 token every 5 seconds, burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(5)` and `burst_size(5)` are
/// positive, which `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    limiter(5, 5).expect("rate limiter config with per_second(5) and burst_size(5) is valid")
}

/// Image search: 1 token every 10 seconds, burst of 3.
///
/// # Panics
///
/// This function will not panic. `per_second(10)` and `burst_size(3)` are
/// positive, which `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn image_search_rate_limiter() -> RateLimiterLayer {
    limiter(10, 3).expect("rate limiter config with per_second(10) and burst_size(3) is valid")
}

/// General API: 1 token per second, burst of 50.
///
/// # Panics
///
/// This function will not panic. `per_second(1)` and `burst_size(50)` are
/// positive, which `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50).expect("rate limiter config with per_second(1) and burst_size(50) is valid")
}
