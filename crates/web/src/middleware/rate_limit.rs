//! Rate limiting for the sign-in form using governor and `tower_governor`.
//!
//! The API limits its own auth endpoints too, but it sees every console
//! login as coming through the forwarded address, so the console throttles
//! before spending an API round trip.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use super::client_ip;

/// Keys requests by browser address.
#[derive(Clone, Copy)]
pub struct BrowserIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for BrowserIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip::resolve(req.headers(), req.extensions())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<BrowserIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the sign-in limiter: one attempt every 4 seconds, burst of 8.
///
/// # Panics
///
/// This function will not panic. `per_second(4)` and `burst_size(8)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn login_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(BrowserIpKeyExtractor)
        .per_second(4)
        .burst_size(8)
        .finish()
        .expect("rate limiter config with per_second(4) and burst_size(8) is valid");
    GovernorLayer::new(Arc::new(config))
}
