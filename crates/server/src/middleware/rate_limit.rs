//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the `/auth/*` endpoints are limited: they send email and check
//! passwords, so they are the brute-force and spam surface.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Key extractor for the client IP.
///
/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`, then the socket
/// peer address recorded by `into_make_service_with_connect_info`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// Returns `None` only if governor rejects the quota.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Rewrite governor's plain-text 429 into the JSON error body.
///
/// Keeps the `retry-after` and `x-ratelimit-*` headers governor set.
pub async fn rate_limited_json(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut rewritten = AppError::RateLimited.into_response();
    for (name, value) in &parts.headers {
        let name_str = name.as_str();
        if name_str == "retry-after" || name_str.starts_with("x-ratelimit") {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}
