//! Salon account server library.
//!
//! Registration with emailed one-time codes, an admin approval queue and
//! username/password login, backed by a Firebase Realtime Database. Exposed
//! as a library so the binary, the operator CLI and the integration tests
//! share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, Response, header},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState, rate_limit: Option<RateLimiterLayer>) -> Router {
    let cors = cors_layer(&state.config().cors_origin);

    routes::routes(rate_limit)
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    #[allow(clippy::cast_possible_truncation)] // latency fits in u64 millis
                    span.record("latency_ms", latency.as_millis() as u64);
                    tracing::info!(parent: span, "response");
                }),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::HeaderName::from_static(
            middleware::REQUEST_ID_HEADER,
        )]);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %origin, "Invalid CORS origin; cross-origin requests disabled");
            layer
        }
    }
}
