//! HTTP route handlers for the REST API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                          - Liveness
//! GET   /health/ready                    - Readiness (database)
//!
//! # Auth (rate limited)
//! POST  /auth/login                      - Issue a bearer token
//! POST  /auth/register                   - Self-registration
//!
//! # Users
//! GET   /users                           - Directory (?active=true)
//! POST  /users                           - Create account (admin)
//! GET   /users/me                        - Caller's profile
//! GET   /users/{id}                      - Profile
//! PUT   /users/{id}                      - Partial update (admin)
//!
//! # Contraband
//! GET   /categories                      - Categories by name
//! GET   /contraband-items                - Items, newest seizure first
//! POST  /contraband-items                - Register a seizure
//! GET   /contraband-items/{id}           - Item detail
//! PUT   /contraband-items/{id}/status    - Change status
//! GET   /contraband-items/{id}/files     - Evidence files of an item
//!
//! # Custody
//! GET   /custody/{contraband_id}         - Chain of custody
//! POST  /custody/transfers               - Record a hand-over
//!
//! # Messages
//! GET   /messages                        - Caller's inbox and sent items
//! POST  /messages                        - Send
//! GET   /messages/approvals              - Open approval requests (reports roles)
//! PATCH /messages/{id}/read              - Mark read (recipient only)
//!
//! # Audit
//! GET   /audit-logs                      - Audit trail (?limit)
//!
//! # Files
//! POST  /files/upload                    - Multipart evidence upload
//! GET   /files/{file_name}               - Download a stored file
//! ```

pub mod audit;
pub mod auth;
pub mod contraband;
pub mod custody;
pub mod files;
pub mod health;
pub mod messages;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter())
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route("/me", get(users::me))
        .route("/{id}", get(users::show).put(users::update))
}

/// Create the contraband item routes router.
pub fn contraband_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contraband::index).post(contraband::create))
        .route("/{id}", get(contraband::show))
        .route("/{id}/status", put(contraband::update_status))
        .route("/{id}/files", get(contraband::files))
}

/// Create the custody routes router.
pub fn custody_routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", post(custody::transfer))
        .route("/{contraband_id}", get(custody::chain))
}

/// Create the message routes router.
pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(messages::index).post(messages::create))
        .route("/approvals", get(messages::approvals))
        .route("/{id}/read", patch(messages::mark_read))
}

/// Create the file routes router.
pub fn file_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(files::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/{file_name}", get(files::download))
}

/// Create all routes for the API.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .route("/categories", get(contraband::categories))
        .nest("/contraband-items", contraband_routes())
        .nest("/custody", custody_routes())
        .nest("/messages", message_routes())
        .route("/audit-logs", get(audit::index))
        .nest("/files", file_routes(max_upload_bytes))
}
