//! Login and self-registration.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use cms_core::records::{CreatedId, LoginRequest, LoginResponse, NewUser};

use crate::error::Result;
use crate::middleware::ClientIp;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// `POST /auth/login`
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = AuthService::new(state.pool(), state.tokens())
        .login(&request)
        .await?;
    tracing::info!(user_id = %response.user.id, "Login succeeded");
    Ok(Json(response))
}

/// `POST /auth/register`
#[instrument(skip(state, ip, new_user), fields(email = %new_user.email))]
pub async fn register(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<CreatedId>)> {
    let user = AuthService::new(state.pool(), state.tokens())
        .register(&new_user, ip.as_deref())
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");
    Ok((
        StatusCode::CREATED,
        Json(CreatedId {
            id: user.id.as_uuid(),
        }),
    ))
}
