//! Account management commands.
//!
//! `user create` exists to bootstrap the first administrator: the API only
//! lets administrators create privileged accounts, and self-registration
//! always yields a field officer.

use cms_api::db::UserRepository;
use cms_api::db::audit;
use cms_api::db::users::{AccountAudit, CreateUser};
use cms_api::services::auth::hash_password;
use cms_core::Role;
use cms_core::records::NewUser;
use cms_core::validate::{non_blank, validate_new_user};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandError, connect};

/// Account details from the command line.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub badge_number: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

impl NewAccount {
    fn into_new_user(self, password: String) -> Result<NewUser, CommandError> {
        let role: Role = self.role.parse().map_err(|_| {
            CommandError::Invalid(format!(
                "Invalid role: {}. Valid roles: admin, supervisor, field_officer, \
                 warehouse_manager, auditor",
                self.role
            ))
        })?;
        Ok(NewUser {
            email: self.email,
            password,
            full_name: self.full_name,
            role: Some(role),
            badge_number: self.badge_number.as_deref().and_then(non_blank),
            department: self.department.as_deref().and_then(non_blank),
            phone: self.phone.as_deref().and_then(non_blank),
        })
    }
}

/// Password from `CMS_USER_PASSWORD`, or the first line of stdin.
async fn read_password() -> Result<String, CommandError> {
    if let Ok(password) = std::env::var("CMS_USER_PASSWORD") {
        return Ok(password);
    }
    tracing::info!("Reading password from stdin (first line)");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Create an account directly in the database.
///
/// # Errors
///
/// Returns an error for invalid input, a taken email or badge number, or a
/// database failure.
pub async fn create(account: NewAccount) -> Result<(), CommandError> {
    let password = read_password().await?;
    let new_user = account.into_new_user(password)?;
    let email = validate_new_user(&new_user).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let password_hash = hash_password(&new_user.password)?;

    let pool = connect().await?;
    let role = new_user.role.unwrap_or_default();
    let user = CreateUser {
        email: &email,
        password_hash: &password_hash,
        full_name: new_user.full_name.trim(),
        role,
        badge_number: new_user.badge_number.as_deref(),
        department: new_user.department.as_deref(),
        phone: new_user.phone.as_deref(),
    };
    // Console-created accounts have no signed-in actor.
    let audit = AccountAudit {
        actor: None,
        action: audit::CREATE_USER,
        ip_address: None,
    };
    let user = UserRepository::new(&pool).create(&user, audit).await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}

/// Print every account, one per line.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool).list(false).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<36}  {:<32}  {:<24}  {:<18}  {:<10}  ACTIVE",
            "ID", "EMAIL", "NAME", "ROLE", "BADGE"
        );
        for user in &users {
            println!(
                "{:<36}  {:<32}  {:<24}  {:<18}  {:<10}  {}",
                user.id,
                user.email,
                user.full_name,
                user.role.as_str(),
                user.badge_number.as_deref().unwrap_or("-"),
                if user.is_active { "yes" } else { "no" }
            );
        }
    }
    tracing::info!(count = users.len(), "Listed users");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(role: &str) -> NewAccount {
        NewAccount {
            email: "admin@police.gov.et".into(),
            full_name: "First Admin".into(),
            role: role.into(),
            badge_number: Some("  ".into()),
            department: Some("HQ".into()),
            phone: None,
        }
    }

    #[test]
    fn test_account_to_new_user() {
        let user = account("admin").into_new_user("long-enough".into()).unwrap();
        assert_eq!(user.role, Some(Role::Admin));
        assert_eq!(user.badge_number, None);
        assert_eq!(user.department.as_deref(), Some("HQ"));
        assert!(validate_new_user(&user).is_ok());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = account("sheriff").into_new_user("long-enough".into()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid role: sheriff"));
    }
}
