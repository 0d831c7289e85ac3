//! Authentication route handlers for the console.
//!
//! Sign-in exchanges credentials for an API token, which is kept in the
//! server-side session together with the officer's profile.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    handler::Handler,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cms_core::records::{LoginRequest, NewUser};
use cms_core::validate::{non_blank, validate_new_user};

use crate::client::ClientError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::session::{push_flash, sign_in, sign_out, take_flashes};
use crate::middleware::{Visitor, login_rate_limiter};
use crate::models::{CurrentOfficer, Flash};
use crate::state::AppState;

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
    flashes: Vec<Flash>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
struct RegisterTemplate {
    form: RegisterForm,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    email: String,
    password: String,
    confirm_password: String,
    full_name: String,
    badge_number: String,
    department: String,
    phone: String,
}

impl RegisterForm {
    fn to_new_user(&self) -> Result<NewUser, String> {
        if self.password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        let user = NewUser {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            full_name: self.full_name.trim().to_string(),
            role: None,
            badge_number: non_blank(&self.badge_number),
            department: non_blank(&self.department),
            phone: non_blank(&self.phone),
        };
        validate_new_user(&user).map_err(|e| e.to_string())?;
        Ok(user)
    }

    /// The form as re-rendered after a failure: passwords are never echoed.
    fn without_passwords(mut self) -> Self {
        self.password.clear();
        self.confirm_password.clear();
        self
    }
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/login",
            get(login_page).post(login.layer(login_rate_limiter())),
        )
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/logout", post(logout))
}

/// Render the sign-in page.
///
/// GET /auth/login
async fn login_page(visitor: Visitor) -> Response {
    if visitor.current.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        email: String::new(),
        error: None,
        flashes: take_flashes(&visitor.session).await,
    }
    .into_response()
}

/// Sign in.
///
/// POST /auth/login
#[instrument(skip(visitor, state, form), fields(email = %form.email))]
async fn login(
    visitor: Visitor,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let request = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password,
    };

    let error = match state.api().login(&visitor.caller(), &request).await {
        Ok(response) => {
            let officer = CurrentOfficer::from(&response.user);
            sign_in(&visitor.session, &officer, &response.token).await?;
            tracing::info!(user_id = %officer.id, role = %officer.role, "Officer signed in");
            push_flash(
                &visitor.session,
                Flash::success(format!("Welcome back, {}", officer.full_name)),
            )
            .await;
            return Ok(Redirect::to("/").into_response());
        }
        Err(ClientError::Unauthorized) => {
            "Invalid email or password, or the account is deactivated".to_string()
        }
        Err(e) if e.is_server_error() => {
            tracing::error!(error = %e, "Sign-in failed");
            "Sign-in is unavailable right now. Please try again shortly.".to_string()
        }
        Err(e) => e.to_string(),
    };

    Ok(LoginTemplate {
        email: request.email,
        error: Some(error),
        flashes: Vec::new(),
    }
    .into_response())
}

/// Render the sign-up page.
///
/// GET /auth/register
async fn register_page(visitor: Visitor) -> Response {
    if visitor.current.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        form: RegisterForm::default(),
        error: None,
    }
    .into_response()
}

/// Create an account. New accounts start as field officers.
///
/// POST /auth/register
#[instrument(skip(visitor, state, form), fields(email = %form.email))]
async fn register(
    visitor: Visitor,
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let user = match form.to_new_user() {
        Ok(user) => user,
        Err(error) => {
            return RegisterTemplate {
                form: form.without_passwords(),
                error: Some(error),
            }
            .into_response();
        }
    };

    match state.api().register(&visitor.caller(), &user).await {
        Ok(created) => {
            tracing::info!(user_id = %created.id, "Account registered");
            push_flash(
                &visitor.session,
                Flash::success("Account created. Please sign in."),
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            if e.is_server_error() {
                tracing::error!(error = %e, "Registration failed");
            }
            RegisterTemplate {
                form: form.without_passwords(),
                error: Some(e.to_string()),
            }
            .into_response()
        }
    }
}

/// Sign out and clear the session.
///
/// POST /auth/logout
async fn logout(session: Session) -> Redirect {
    if let Err(e) = sign_out(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on logout");
    }
    Redirect::to("/auth/login")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            email: " Meron@Police.et ".into(),
            password: "s3cure-pass".into(),
            confirm_password: "s3cure-pass".into(),
            full_name: "Meron Tesfaye".into(),
            badge_number: "  ".into(),
            department: "Customs Liaison".into(),
            phone: String::new(),
        }
    }

    #[test]
    fn test_register_form_builds_new_user() {
        let user = form().to_new_user().unwrap();
        assert_eq!(user.email, "Meron@Police.et");
        assert_eq!(user.role, None);
        assert_eq!(user.badge_number, None);
        assert_eq!(user.department.as_deref(), Some("Customs Liaison"));
    }

    #[test]
    fn test_register_form_rejects_mismatched_passwords() {
        let mut form = form();
        form.confirm_password = "other-pass".into();
        assert_eq!(form.to_new_user().unwrap_err(), "Passwords do not match");
    }

    #[test]
    fn test_rerendered_form_drops_passwords() {
        let form = form().without_passwords();
        assert!(form.password.is_empty());
        assert!(form.confirm_password.is_empty());
        assert_eq!(form.full_name, "Meron Tesfaye");
    }
}
