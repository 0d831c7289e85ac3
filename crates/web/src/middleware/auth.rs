//! Authentication extractors for the console.
//!
//! Provides extractors for requiring a signed-in officer in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;

use cms_core::{Capability, UserId};

use super::{client_ip, request_id::REQUEST_ID_HEADER, session};
use crate::client::Caller;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentOfficer;

/// Extractor that requires a signed-in officer.
///
/// Carries what every page needs to call the API on the officer's behalf:
/// the bearer token, the browser address and the request id.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(officer: Officer) -> impl IntoResponse {
///     format!("Hello, {}!", officer.current.full_name)
/// }
/// ```
pub struct Officer {
    pub current: CurrentOfficer,
    pub session: Session,
    token: SecretString,
    context: RequestContext,
}

/// Error returned when a page requires a signed-in officer.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page.
    RedirectToLogin,
    /// The session layer is missing from the router.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::SessionUnavailable => {
                tracing::error!("Session layer missing; cannot authenticate request");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl Officer {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.current.id
    }

    /// Whether the officer's role holds `capability`.
    #[must_use]
    pub const fn can(&self, capability: Capability) -> bool {
        self.current.role.can(capability)
    }

    /// Reject with the "Access Restricted" page unless the role holds
    /// `capability`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Restricted`.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::info!(
                user_id = %self.current.id,
                role = %self.current.role,
                ?capability,
                "Page restricted for role"
            );
            Err(AppError::Restricted(capability))
        }
    }

    /// Credentials for an API call made on this officer's behalf.
    #[must_use]
    pub fn caller(&self) -> Caller<'_> {
        Caller {
            token: Some(&self.token),
            client_ip: self.context.client_ip.as_deref(),
            request_id: self.context.request_id.as_deref(),
        }
    }
}

impl<S> FromRequestParts<S> for Officer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::SessionUnavailable)?;

        let (current, token) = session::signed_in(&session)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection::RedirectToLogin)?;
        set_sentry_user(&current);

        Ok(Self {
            current,
            session,
            token,
            context: RequestContext::from_parts(parts),
        })
    }
}

/// Extractor for pages open to anyone (sign-in, sign-up).
pub struct Visitor {
    pub session: Session,
    /// The officer, when someone is already signed in.
    pub current: Option<CurrentOfficer>,
    context: RequestContext,
}

impl Visitor {
    /// Credentials for an unauthenticated API call.
    #[must_use]
    pub fn caller(&self) -> Caller<'_> {
        Caller::anonymous(
            self.context.client_ip.as_deref(),
            self.context.request_id.as_deref(),
        )
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::SessionUnavailable)?;

        let current = session::signed_in(&session)
            .await
            .ok()
            .flatten()
            .map(|(officer, _)| officer);

        Ok(Self {
            session,
            current,
            context: RequestContext::from_parts(parts),
        })
    }
}

/// Per-request values forwarded to the API.
#[derive(Debug, Clone, Default)]
struct RequestContext {
    client_ip: Option<String>,
    request_id: Option<String>,
}

impl RequestContext {
    fn from_parts(parts: &Parts) -> Self {
        Self {
            client_ip: client_ip::resolve(&parts.headers, &parts.extensions).map(|ip| ip.to_string()),
            request_id: parts
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }
}
