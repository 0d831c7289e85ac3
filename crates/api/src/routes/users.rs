//! User directory and administration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use cms_core::records::{NewUser, UserProfile, UserUpdate};
use cms_core::{Capability, Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{ApiError, Result};
use crate::middleware::{AuthUser, ClientIp};
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only active accounts (used for transfer recipients).
    #[serde(default)]
    pub active: Option<bool>,
}

/// `GET /users`
#[instrument(skip(_caller, state))]
pub async fn index(
    _caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let users = UserRepository::new(state.pool())
        .list(query.active.unwrap_or(false))
        .await?;
    Ok(Json(users))
}

/// `GET /users/me`
#[instrument(skip(caller, state), fields(user_id = %caller.id()))]
pub async fn me(caller: AuthUser, State(state): State<AppState>) -> Result<Json<UserProfile>> {
    UserRepository::new(state.pool())
        .get(caller.id())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Account no longer exists".to_string()))
}

/// `GET /users/{id}`
#[instrument(skip(_caller, state))]
pub async fn show(
    _caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    UserRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// `POST /users` (admin)
#[instrument(skip(caller, state, ip, new_user), fields(email = %new_user.email))]
pub async fn create(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    caller.require(Capability::ManageUsers)?;

    let user = AuthService::new(state.pool(), state.tokens())
        .create_account(&new_user, caller.id(), ip.as_deref())
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Account created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Refuse updates that would lock an admin out of their own account.
fn check_self_update(caller: &AuthUser, target: UserId, update: &UserUpdate) -> Result<()> {
    if caller.id() != target {
        return Ok(());
    }
    if update.is_active == Some(false) {
        return Err(ApiError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    if update.role.is_some_and(|role| role != Role::Admin) {
        return Err(ApiError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    Ok(())
}

/// `PUT /users/{id}` (admin)
#[instrument(skip(caller, state, ip, update))]
pub async fn update(
    caller: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserProfile>> {
    caller.require(Capability::ManageUsers)?;
    check_self_update(&caller, id, &update)?;
    if update.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }
    if update
        .full_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(ApiError::BadRequest("Full name cannot be blank".to_string()));
    }

    let after = UserRepository::new(state.pool())
        .update(id, &update, caller.id(), ip.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %id, "Account updated");
    Ok(Json(after))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::services::token::Claims;

    fn admin(id: UserId) -> AuthUser {
        AuthUser(Claims {
            sub: id,
            email: "admin@police.et".into(),
            role: Role::Admin,
            full_name: "Admin".into(),
            iss: "cms".into(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
        })
    }

    #[test]
    fn test_admin_cannot_deactivate_self() {
        let id = UserId::generate();
        let update = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        assert!(check_self_update(&admin(id), id, &update).is_err());
        assert!(check_self_update(&admin(id), UserId::generate(), &update).is_ok());
    }

    #[test]
    fn test_admin_cannot_demote_self() {
        let id = UserId::generate();
        let demote = UserUpdate {
            role: Some(Role::Auditor),
            ..UserUpdate::default()
        };
        let keep = UserUpdate {
            role: Some(Role::Admin),
            full_name: Some("Renamed".into()),
            ..UserUpdate::default()
        };
        assert!(check_self_update(&admin(id), id, &demote).is_err());
        assert!(check_self_update(&admin(id), id, &keep).is_ok());
    }
}
