//! Authentication error types.

use thiserror::Error;

use cms_core::Role;
use cms_core::validate::ValidationErrors;

use crate::db::RepositoryError;
use crate::services::token::TokenError;

/// Errors that can occur during authentication and account creation.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password, or deactivated account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The submitted account fails validation.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Self-registration asked for a privileged role.
    #[error("role {0} cannot be self-assigned")]
    RoleNotAllowed(Role),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
