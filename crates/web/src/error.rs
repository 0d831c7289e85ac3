//! Unified error handling for the console.
//!
//! Most API failures never reach this type: handlers turn them into flash
//! toasts and carry on. What ends up here is the failure of the page itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use cms_core::Capability;

use crate::client::ClientError;
use crate::middleware::SessionExpired;
use crate::models::CurrentOfficer;

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum AppError {
    /// API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The officer's role does not hold the capability.
    #[error("Access restricted: you cannot {}", .0.description())]
    Restricted(Capability),

    /// Page or record not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed form or query input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The page shown for a role-gated page.
#[derive(Template, WebTemplate)]
#[template(path = "restricted.html")]
struct RestrictedTemplate {
    action: &'static str,
}

/// Generic error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status: u16,
    title: &'static str,
    message: String,
}

impl AppError {
    /// Whether the failure lies with this service or the API.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Client(e) => e.is_server_error(),
            Self::Session(_) | Self::Internal(_) => true,
            Self::Restricted(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Client(ClientError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Client(ClientError::Forbidden(_)) | Self::Restricted(_) => StatusCode::FORBIDDEN,
            Self::Client(ClientError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Client(e) if e.is_server_error() => StatusCode::BAD_GATEWAY,
            Self::Client(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console request error"
            );
        }

        match self {
            // The token expired or was revoked: drop the session and start over.
            Self::Client(ClientError::Unauthorized) => {
                let mut response = Redirect::to("/auth/login").into_response();
                response.extensions_mut().insert(SessionExpired);
                response
            }
            Self::Restricted(capability) => (
                StatusCode::FORBIDDEN,
                RestrictedTemplate {
                    action: capability.description(),
                },
            )
                .into_response(),
            other => {
                let status = other.status();
                let title = status.canonical_reason().unwrap_or("Error");
                // Don't expose internal error details to officers
                let message = match &other {
                    Self::Client(e) if e.is_server_error() => {
                        "The records service is unavailable. Please try again shortly.".to_string()
                    }
                    Self::Session(_) | Self::Internal(_) => "Something went wrong.".to_string(),
                    Self::Client(e) => e.to_string(),
                    Self::NotFound(what) => format!("{what} was not found."),
                    Self::BadRequest(why) => why.clone(),
                    Self::Restricted(_) => String::new(),
                };
                (
                    status,
                    ErrorTemplate {
                        status: status.as_u16(),
                        title,
                        message,
                    },
                )
                    .into_response()
            }
        }
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(officer: &CurrentOfficer) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(officer.id.to_string()),
            email: Some(officer.email.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Seizure".to_string());
        assert_eq!(err.to_string(), "Not found: Seizure");

        let err = AppError::Restricted(Capability::ViewAudit);
        assert_eq!(
            err.to_string(),
            "Access restricted: you cannot view the audit trail"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Restricted(Capability::ManageUsers)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Client(ClientError::from_status(
                StatusCode::SERVICE_UNAVAILABLE,
                None
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_redirects_and_marks_session_expired() {
        let response = AppError::Client(ClientError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/auth/login");
        assert!(response.extensions().get::<SessionExpired>().is_some());
    }
}
