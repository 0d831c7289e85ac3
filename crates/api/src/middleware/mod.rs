//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. CORS (only when `CMS_CORS_ORIGIN` is set)
//! 6. Rate limiting on `/auth/*` (governor)
//!
//! Authentication is not a layer: handlers take an [`AuthUser`] argument.

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::AuthUser;
pub use client_ip::ClientIp;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
