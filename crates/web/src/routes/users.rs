//! User management (administrators only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use cms_core::filter::{SearchTerm, UserFilter, optional_choice};
use cms_core::records::{NewUser, UserProfile, UserUpdate};
use cms_core::validate::{non_blank, validate_new_user};
use cms_core::{Capability, Role, UserId};

use super::contraband::SelectOption;
use super::{Shell, action_failed, date, redirect_with};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::models::Flash;
use crate::state::AppState;

/// One row of the user table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub badge: String,
    pub department: String,
    pub role: Role,
    pub role_label: &'static str,
    pub is_active: bool,
    pub joined: String,
    /// The signed-in administrator's own row; self-demotion and
    /// self-deactivation controls are hidden.
    pub is_self: bool,
}

impl UserRow {
    fn new(user: &UserProfile, me: UserId) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.to_string(),
            badge: user.badge_number.clone().unwrap_or_default(),
            department: user.department.clone().unwrap_or_default(),
            role: user.role,
            role_label: user.role.label(),
            is_active: user.is_active,
            joined: date(user.created_at),
            is_self: user.id == me,
        }
    }
}

fn role_options(selected: Option<Role>, all_label: Option<&str>) -> Vec<SelectOption> {
    let roles = Role::ALL
        .iter()
        .map(|r| SelectOption::new(r.as_str(), r.label(), selected == Some(*r)));
    match all_label {
        Some(label) => std::iter::once(SelectOption::new("all", label, selected.is_none()))
            .chain(roles)
            .collect(),
        None => roles.collect(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    q: Option<String>,
    role: Option<String>,
}

/// User management template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub shell: Shell,
    pub rows: Vec<UserRow>,
    pub total: usize,
    pub search: String,
    pub role_filter: Vec<SelectOption>,
    pub roles: Vec<SelectOption>,
}

/// User table with search and role filter.
///
/// GET /users
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn index(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<UsersTemplate, AppError> {
    officer.require(Capability::ManageUsers)?;
    let mut shell = Shell::new(&officer, "users").await;
    let users = shell.or_toast(state.api().users(&officer.caller(), false).await, "users")?;

    let filter = UserFilter {
        search: SearchTerm::new(query.q.as_deref().unwrap_or_default()),
        role: optional_choice(query.role.as_deref()),
    };
    let rows = filter
        .apply(&users)
        .into_iter()
        .map(|u| UserRow::new(u, officer.id()))
        .collect();

    Ok(UsersTemplate {
        shell,
        rows,
        total: users.len(),
        search: query.q.unwrap_or_default(),
        role_filter: role_options(filter.role, Some("All Roles")),
        roles: role_options(None, None),
    })
}

/// New account form posted by an administrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUserForm {
    email: String,
    password: String,
    full_name: String,
    role: String,
    badge_number: String,
    department: String,
    phone: String,
}

impl NewUserForm {
    fn to_new_user(&self) -> Result<NewUser, String> {
        let role: Role = self.role.parse().map_err(|_| "Select a role".to_string())?;
        let user = NewUser {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            full_name: self.full_name.trim().to_string(),
            role: Some(role),
            badge_number: non_blank(&self.badge_number),
            department: non_blank(&self.department),
            phone: non_blank(&self.phone),
        };
        validate_new_user(&user).map_err(|e| e.to_string())?;
        Ok(user)
    }
}

/// Create an account with any role.
///
/// POST /users
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn create(
    officer: Officer,
    State(state): State<AppState>,
    Form(form): Form<NewUserForm>,
) -> Result<Redirect, AppError> {
    officer.require(Capability::ManageUsers)?;
    let user = match form.to_new_user() {
        Ok(user) => user,
        Err(problem) => {
            return Ok(redirect_with(&officer.session, Flash::error(problem), "/users").await);
        }
    };

    match state.api().create_user(&officer.caller(), &user).await {
        Ok(created) => {
            tracing::info!(new_user_id = %created.id, role = created.role.as_str(), "User created");
            Ok(redirect_with(
                &officer.session,
                Flash::success(format!(
                    "User {} has been created successfully.",
                    created.full_name
                )),
                "/users",
            )
            .await)
        }
        Err(e) => action_failed(&officer.session, e, "create user", "/users").await,
    }
}

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    is_active: bool,
}

/// Activate or deactivate an account.
///
/// POST /users/{id}/active
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn set_active(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Form(form): Form<ActiveForm>,
) -> Result<Redirect, AppError> {
    officer.require(Capability::ManageUsers)?;
    let update = UserUpdate {
        is_active: Some(form.is_active),
        ..UserUpdate::default()
    };
    apply(&officer, &state, id, &update).await
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    role: String,
}

/// Change an account's role.
///
/// POST /users/{id}/role
#[instrument(skip(officer, state, form), fields(user_id = %officer.id()))]
pub async fn set_role(
    officer: Officer,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect, AppError> {
    officer.require(Capability::ManageUsers)?;
    let Ok(role) = form.role.parse::<Role>() else {
        return Ok(redirect_with(&officer.session, Flash::error("Unknown role"), "/users").await);
    };
    let update = UserUpdate {
        role: Some(role),
        ..UserUpdate::default()
    };
    apply(&officer, &state, id, &update).await
}

async fn apply(
    officer: &Officer,
    state: &AppState,
    id: UserId,
    update: &UserUpdate,
) -> Result<Redirect, AppError> {
    match state.api().update_user(&officer.caller(), id, update).await {
        Ok(user) => {
            tracing::info!(target_user = %user.id, ?update, "User updated");
            Ok(redirect_with(
                &officer.session,
                Flash::success("User information has been updated successfully."),
                "/users",
            )
            .await)
        }
        Err(e) => action_failed(&officer.session, e, "update user", "/users").await,
    }
}
