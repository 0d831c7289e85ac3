//! Session layer and session helpers for the console.
//!
//! Sessions live in memory: a console restart signs everyone out, which is
//! acceptable because the API token is the real credential and can simply
//! be requested again.

use axum::{extract::Request, middleware::Next, response::Response};
use secrecy::SecretString;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::WebConfig;
use crate::models::{CurrentOfficer, Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cms_session";

/// Inactivity timeout (8 hours, one shift).
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.session_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Response extension set when the API answered 401 for this session.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Flush the session when a handler reported [`SessionExpired`].
pub async fn expire_session_middleware(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_some() {
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to flush expired session");
        } else {
            tracing::info!("API token rejected; session cleared");
        }
    }
    response
}

/// Store a fresh sign-in. The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    officer: &CurrentOfficer,
    token: &str,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_OFFICER, officer).await?;
    session.insert(session_keys::API_TOKEN, token).await
}

/// Drop everything stored for this session (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Load the signed-in officer and the API token, if both are present.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn signed_in(
    session: &Session,
) -> Result<Option<(CurrentOfficer, SecretString)>, tower_sessions::session::Error> {
    let officer: Option<CurrentOfficer> = session.get(session_keys::CURRENT_OFFICER).await?;
    let token: Option<String> = session.get(session_keys::API_TOKEN).await?;
    Ok(officer.zip(token.map(SecretString::from)))
}

/// Queue a toast for the next rendered page.
///
/// Failures are logged rather than returned: a lost toast must not turn a
/// successful action into an error page.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);
    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take and clear the queued toasts.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
