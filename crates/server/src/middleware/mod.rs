//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (configured front-end origin only)
//! 5. Rate limiting on `/auth/*` (governor)
//!
//! Admin routes authenticate per handler with the [`RequireAdmin`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireSession};
pub use rate_limit::{RateLimiterLayer, auth_rate_limiter, rate_limited_json};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
