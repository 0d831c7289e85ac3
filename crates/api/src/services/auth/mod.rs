//! Authentication service.
//!
//! Password login, self-registration and admin account creation.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use cms_core::records::{LoginRequest, LoginResponse, NewUser, UserProfile};
use cms_core::validate::validate_new_user;
use cms_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::audit;
use crate::db::users::{AccountAudit, CreateUser, UserRepository};
use crate::services::token::TokenService;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Login with email and password and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a malformed or unknown
    /// email, a wrong password, or a deactivated account.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = Email::parse(&request.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.password, &password_hash)?;

        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login refused for deactivated account");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user, Utc::now())?;
        Ok(LoginResponse { token, user })
    }

    /// Self-registration. The role defaults to field officer and may not be admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for invalid input,
    /// `AuthError::RoleNotAllowed` when admin is requested, and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(
        &self,
        new_user: &NewUser,
        ip_address: Option<&str>,
    ) -> Result<UserProfile, AuthError> {
        let role = new_user.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AuthError::RoleNotAllowed(role));
        }
        let audit = AccountAudit {
            actor: None,
            action: audit::REGISTER_USER,
            ip_address,
        };
        self.insert_account(new_user, role, audit).await
    }

    /// Account creation by an administrator. Any role may be assigned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for invalid input and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn create_account(
        &self,
        new_user: &NewUser,
        created_by: UserId,
        ip_address: Option<&str>,
    ) -> Result<UserProfile, AuthError> {
        let audit = AccountAudit {
            actor: Some(created_by),
            action: audit::CREATE_USER,
            ip_address,
        };
        self.insert_account(new_user, new_user.role.unwrap_or_default(), audit)
            .await
    }

    async fn insert_account(
        &self,
        new_user: &NewUser,
        role: Role,
        audit: AccountAudit<'_>,
    ) -> Result<UserProfile, AuthError> {
        let email = validate_new_user(new_user)?;
        let password_hash = hash_password(&new_user.password)?;

        let badge_number = trimmed(new_user.badge_number.as_deref());
        let department = trimmed(new_user.department.as_deref());
        let phone = trimmed(new_user.phone.as_deref());

        let user = CreateUser {
            email: &email,
            password_hash: &password_hash,
            full_name: new_user.full_name.trim(),
            role,
            badge_number,
            department,
            phone,
        };
        self.users
            .create(&user, audit)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
