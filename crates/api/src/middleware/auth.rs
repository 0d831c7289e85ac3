//! Bearer token extractor.
//!
//! The web console sends `Authorization: Bearer <token>` on every call. The
//! token carries the caller's id and role, so role gates are checked without
//! touching the database.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use cms_core::{Capability, Role, UserId};

use crate::error::{ApiError, set_sentry_user};
use crate::services::token::{Claims, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(caller: AuthUser) -> Result<Json<UserId>, ApiError> {
///     caller.require(Capability::ViewAudit)?;
///     Ok(Json(caller.id()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.0.sub
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Fail with 403 unless the caller's role grants `capability`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` describing the missing permission.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.0.role.can(capability) {
            Ok(())
        } else {
            tracing::info!(
                user_id = %self.0.sub,
                role = %self.0.role,
                ?capability,
                "Permission denied"
            );
            Err(ApiError::Forbidden(format!(
                "Your role does not allow you to {}",
                capability.description()
            )))
        }
    }
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.tokens().verify(token).map_err(|e| match e {
            TokenError::Expired => ApiError::Unauthorized("Session expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        set_sentry_user(&claims.sub, Some(&claims.email));
        Ok(Self(claims))
    }
}
