//! HTTP middleware stack for the console.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request, forwarded to the API)
//! 4. Security headers (CSP allowing evidence photos from the API origin)
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Session expiry (flush the session when the API rejected the token)
//! 7. Rate limiting on `POST /auth/login` (governor)
//!
//! Authentication is not a layer: handlers take an [`Officer`] argument.

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AuthRejection, Officer, Visitor};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SessionExpired, create_session_layer, expire_session_middleware};
