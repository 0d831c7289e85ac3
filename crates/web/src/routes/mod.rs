//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//!
//! # Auth
//! GET  /auth/login                   - Sign-in page
//! POST /auth/login                   - Sign in (rate limited)
//! GET  /auth/register                - Sign-up page
//! POST /auth/register                - Create an account
//! POST /auth/logout                  - Sign out
//!
//! # Dashboard
//! GET  /                             - Counts, recent seizures
//!
//! # Seizures
//! GET  /seizures/new                 - Registration form
//! POST /seizures                     - Register (multipart, with photos)
//!
//! # Contraband
//! GET  /contraband                   - List (?q, ?status, ?mine)
//! GET  /contraband/{id}              - Detail, custody chain, evidence
//! POST /contraband/{id}/status       - Change status
//! POST /contraband/{id}/transfer     - Record a custody transfer
//! POST /contraband/{id}/files        - Upload evidence files
//!
//! # Messages
//! GET  /messages                     - Inbox / sent / compose (?tab, ?q)
//! POST /messages                     - Send
//! GET  /messages/{id}                - Read (marks inbox messages read)
//! POST /messages/{id}/respond        - Approve / reject an approval request
//!
//! # Users (admin)
//! GET  /users                        - Directory (?q, ?role)
//! POST /users                        - Create account
//! POST /users/{id}/active            - Activate / deactivate
//! POST /users/{id}/role              - Change role
//!
//! # Reports
//! GET  /reports                      - Dashboard (?from, ?to, ?category)
//!
//! # Audit (admin, auditor)
//! GET  /audit                        - Trail (?q, ?action, ?table)
//! GET  /audit/export.csv             - CSV download of the filtered trail
//! ```

pub mod audit;
pub mod auth;
pub mod contraband;
pub mod dashboard;
pub mod evidence;
pub mod health;
pub mod messages;
pub mod reports;
pub mod seizures;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;

use cms_core::{MenuItem, menu_for};

use crate::client::ClientError;
use crate::error::AppError;
use crate::middleware::Officer;
use crate::middleware::session::{push_flash, take_flashes};
use crate::models::Flash;
use crate::state::AppState;

/// Largest multipart form accepted (several evidence photos).
pub const MAX_FORM_BYTES: usize = 50 * 1024 * 1024;

/// Build the console router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth::router())
        .route("/", get(dashboard::dashboard))
        .merge(seizure_routes())
        .merge(contraband_routes())
        .route("/messages", get(messages::index).post(messages::send))
        .route("/messages/{id}", get(messages::show))
        .route("/messages/{id}/respond", post(messages::respond))
        .route("/users", get(users::index).post(users::create))
        .route("/users/{id}/active", post(users::set_active))
        .route("/users/{id}/role", post(users::set_role))
        .route("/reports", get(reports::index))
        .route("/audit", get(audit::index))
        .route("/audit/export.csv", get(audit::export))
}

fn seizure_routes() -> Router<AppState> {
    Router::new()
        .route("/seizures/new", get(seizures::new_form))
        .route(
            "/seizures",
            post(seizures::create).layer(DefaultBodyLimit::max(MAX_FORM_BYTES)),
        )
}

fn contraband_routes() -> Router<AppState> {
    Router::new()
        .route("/contraband", get(contraband::index))
        .route("/contraband/{id}", get(contraband::show))
        .route("/contraband/{id}/status", post(contraband::update_status))
        .route("/contraband/{id}/transfer", post(contraband::transfer))
        .route(
            "/contraband/{id}/files",
            post(contraband::upload_files).layer(DefaultBodyLimit::max(MAX_FORM_BYTES)),
        )
}

// =============================================================================
// Page Shell
// =============================================================================

/// What every signed-in page renders around its content: the officer,
/// their sidebar and pending toasts.
#[derive(Debug, Clone)]
pub struct Shell {
    pub officer_name: String,
    pub role_label: &'static str,
    pub badge: Option<String>,
    pub menu: &'static [MenuItem],
    /// Menu id of the current page.
    pub active: &'static str,
    pub flashes: Vec<Flash>,
}

impl Shell {
    /// Build the shell for `officer`, taking queued toasts from the session.
    pub async fn new(officer: &Officer, active: &'static str) -> Self {
        Self {
            officer_name: officer.current.full_name.clone(),
            role_label: officer.current.role.label(),
            badge: officer.current.badge_number.clone(),
            menu: menu_for(officer.current.role),
            active,
            flashes: take_flashes(&officer.session).await,
        }
    }

    /// Unwrap a fetch for this page, or toast its failure and render with
    /// an empty value.
    ///
    /// # Errors
    ///
    /// Only an expired token is returned; it ends the page with a redirect
    /// to the login form.
    pub fn or_toast<T: Default>(
        &mut self,
        result: Result<T, ClientError>,
        what: &str,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(ClientError::Unauthorized) => Err(ClientError::Unauthorized.into()),
            Err(e) => {
                log_client_error(&e, what);
                self.flashes
                    .push(Flash::error(format!("Failed to load {what}: {e}")));
                Ok(T::default())
            }
        }
    }
}

// =============================================================================
// Action Helpers
// =============================================================================

/// Finish a form post: toast `message` and redirect to `to`.
pub async fn redirect_with(session: &Session, flash: Flash, to: &str) -> Redirect {
    push_flash(session, flash).await;
    Redirect::to(to)
}

/// Finish a failed form post: toast the API's message and redirect back.
///
/// # Errors
///
/// An expired token is returned instead of toasted.
pub async fn action_failed(
    session: &Session,
    err: ClientError,
    what: &str,
    back: &str,
) -> Result<Redirect, AppError> {
    if matches!(err, ClientError::Unauthorized) {
        return Err(err.into());
    }
    log_client_error(&err, what);
    Ok(redirect_with(session, Flash::error(format!("Failed to {what}: {err}")), back).await)
}

fn log_client_error(err: &ClientError, what: &str) {
    if err.is_server_error() {
        tracing::error!(error = %err, "API call failed: {what}");
    } else {
        tracing::warn!(error = %err, "API rejected request: {what}");
    }
}

/// Timestamp as shown in tables: `Jun 15, 2024 10:30`.
#[must_use]
pub fn datetime(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Date as shown in tables: `Jun 15, 2024`.
#[must_use]
pub fn date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Treat an empty form or query value as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_date_formats() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2024, 6, 5, 9, 7, 0).unwrap();
        assert_eq!(datetime(at), "Jun 5, 2024 09:07");
        assert_eq!(date(at), "Jun 5, 2024");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  abc ")), Some("abc"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
