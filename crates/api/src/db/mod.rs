//! Database operations for the CMS `PostgreSQL` database.
//!
//! # Schema: `cms`
//!
//! ## Tables
//!
//! - `users` - Officer accounts (argon2 password hashes)
//! - `contraband_categories` - Category reference data (seeded by migration)
//! - `contraband_items` - Seized items
//! - `custody_chain` - Custody transfers, one row per hand-over
//! - `messages` - Internal messages between officers
//! - `audit_logs` - Append-only audit trail (guarded by a trigger)
//! - `evidence_files` - Metadata of uploaded evidence files
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p cms-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types, so the crate builds without a live database.

pub mod audit;
pub mod categories;
pub mod contraband;
pub mod custody;
pub mod files;
pub mod messages;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use audit::{AuditEntry, AuditRepository};
pub use categories::CategoryRepository;
pub use contraband::ContrabandRepository;
pub use custody::CustodyRepository;
pub use files::EvidenceFileRepository;
pub use messages::MessageRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate email or seizure number).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The request references a row that does not exist or cannot be used.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The item's current status does not allow the change.
    #[error(transparent)]
    Transition(#[from] cms_core::TransitionError),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to domain errors.
    ///
    /// `conflict` describes what was duplicated, e.g. "email already exists".
    pub(crate) fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("foreign key");
                return Self::InvalidReference(constraint.to_owned());
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// Used by tests that exercise routes which never reach the database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
}

/// Embedded migrations from `crates/api/migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
