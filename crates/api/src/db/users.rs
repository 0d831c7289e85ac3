//! User repository for database operations.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::PgPool;

use cms_core::records::{UserProfile, UserUpdate};
use cms_core::{Email, Role, UserId};

use super::RepositoryError;
use super::audit::{self, AuditEntry};

const USER_COLUMNS: &str = "id, email, full_name, badge_number, role, department, phone, \
                            is_active, created_at";

/// Row shape of `cms.users` without the password hash.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    full_name: String,
    badge_number: Option<String>,
    role: Role,
    department: Option<String>,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            badge_number: row.badge_number,
            role: row.role,
            department: row.department,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields of a new account, already validated and hashed.
#[derive(Debug, Clone)]
pub struct CreateUser<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub role: Role,
    pub badge_number: Option<&'a str>,
    pub department: Option<&'a str>,
    pub phone: Option<&'a str>,
}

/// Who an account change is recorded against in the audit trail.
#[derive(Debug, Clone, Copy)]
pub struct AccountAudit<'a> {
    /// `None` records the new account as its own actor (self-registration).
    pub actor: Option<UserId>,
    pub action: &'a str,
    pub ip_address: Option<&'a str>,
}

impl<'a> AccountAudit<'a> {
    /// The audit row for `created`.
    fn entry_for(self, created: &UserProfile) -> AuditEntry<'a> {
        AuditEntry::new(self.actor.unwrap_or(created.id), self.action, "users")
            .record(created.id)
            .new_values(account_snapshot(created))
            .ip(self.ip_address)
    }
}

/// Audit values for a newly created account.
fn account_snapshot(user: &UserProfile) -> Value {
    json!({
        "email": user.email,
        "full_name": user.full_name,
        "role": user.role,
        "badge_number": user.badge_number,
    })
}

/// The fields an administrator may change, as they were before an update.
fn editable_snapshot(user: &UserProfile) -> Value {
    json!({
        "full_name": user.full_name,
        "badge_number": user.badge_number,
        "role": user.role,
        "department": user.department,
        "phone": user.phone,
        "is_active": user.is_active,
    })
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List users ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<UserProfile>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM cms.users \
             WHERE ($1 = FALSE OR is_active) \
             ORDER BY full_name, email"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(active_only)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM cms.users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(UserProfile::from))
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(UserProfile, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM cms.users WHERE email = $1");
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }

    /// Create a user and its audit row in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or badge number already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user: &CreateUser<'_>,
        audit: AccountAudit<'_>,
    ) -> Result<UserProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO cms.users \
               (email, password_hash, full_name, role, badge_number, department, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let created: UserProfile = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.full_name)
            .bind(user.role)
            .bind(user.badge_number)
            .bind(user.department)
            .bind(user.phone)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, "email or badge number already registered")
            })?
            .into();

        audit::insert(&mut *tx, &audit.entry_for(&created)).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Apply a partial update and write its `UPDATE_USER` audit row in one
    /// transaction. Absent fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the new badge number is taken.
    pub async fn update(
        &self,
        id: UserId,
        update: &UserUpdate,
        actor: UserId,
        ip_address: Option<&str>,
    ) -> Result<UserProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {USER_COLUMNS} FROM cms.users WHERE id = $1 FOR UPDATE");
        let before: UserProfile = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        let sql = format!(
            "UPDATE cms.users SET \
               full_name = COALESCE($2, full_name), \
               badge_number = COALESCE($3, badge_number), \
               role = COALESCE($4, role), \
               department = COALESCE($5, department), \
               phone = COALESCE($6, phone), \
               is_active = COALESCE($7, is_active), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let after: UserProfile = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(update.full_name.as_deref())
            .bind(update.badge_number.as_deref())
            .bind(update.role)
            .bind(update.department.as_deref())
            .bind(update.phone.as_deref())
            .bind(update.is_active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "badge number already registered"))?
            .into();

        let new_values = serde_json::to_value(update)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable update: {e}")))?;
        let entry = AuditEntry::new(actor, audit::UPDATE_USER, "users")
            .record(id)
            .old_values(editable_snapshot(&before))
            .new_values(new_values)
            .ip(ip_address);
        audit::insert(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(after)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cms.users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn officer() -> UserProfile {
        UserProfile {
            id: UserId::generate(),
            email: Email::parse("abebe.kebede@police.et").unwrap(),
            full_name: "Abebe Kebede".into(),
            badge_number: Some("ET-1042".into()),
            role: Role::FieldOfficer,
            department: Some("Customs".into()),
            phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_account_snapshot_leaves_out_credentials() {
        let snapshot = account_snapshot(&officer());
        assert_eq!(snapshot["email"], "abebe.kebede@police.et");
        assert_eq!(snapshot["role"], "field_officer");
        assert_eq!(snapshot["badge_number"], "ET-1042");
        assert!(snapshot.get("password_hash").is_none());
    }

    #[test]
    fn test_editable_snapshot_covers_every_updatable_field() {
        let snapshot = editable_snapshot(&officer());
        let update = UserUpdate {
            full_name: Some("A. Kebede".into()),
            badge_number: Some("ET-2001".into()),
            role: Some(Role::Supervisor),
            department: Some("Narcotics".into()),
            phone: Some("+251911000000".into()),
            is_active: Some(false),
        };
        let changed = serde_json::to_value(&update).unwrap();

        for field in changed.as_object().unwrap().keys() {
            assert!(snapshot.get(field).is_some(), "{field} missing from old values");
        }
        assert_eq!(snapshot["is_active"], true);
        assert_eq!(snapshot["phone"], Value::Null);
    }

    #[test]
    fn test_self_registration_is_its_own_actor() {
        let user = officer();
        let audit = AccountAudit {
            actor: None,
            action: audit::REGISTER_USER,
            ip_address: Some("10.0.0.7"),
        };
        let entry = audit.entry_for(&user);

        assert_eq!(entry.user_id, Some(user.id));
        assert_eq!(entry.record_id, Some(user.id.to_string()));
        assert_eq!(entry.ip_address, Some("10.0.0.7"));
        assert_eq!(entry.new_values.unwrap()["full_name"], "Abebe Kebede");
    }

    #[test]
    fn test_admin_created_account_is_recorded_against_the_admin() {
        let admin = UserId::generate();
        let user = officer();
        let audit = AccountAudit {
            actor: Some(admin),
            action: audit::CREATE_USER,
            ip_address: None,
        };
        let entry = audit.entry_for(&user);

        assert_eq!(entry.user_id, Some(admin));
        assert_eq!(entry.action, "CREATE_USER");
        assert_eq!(entry.record_id, Some(user.id.to_string()));
    }
}
