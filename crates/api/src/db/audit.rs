//! Audit trail. Rows are only ever inserted; a trigger rejects updates and deletes.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use cms_core::records::{AuditLog, OfficerRef};
use cms_core::{AuditLogId, UserId};

use super::RepositoryError;

pub const CREATE_SEIZURE: &str = "CREATE_SEIZURE";
pub const UPDATE_STATUS: &str = "UPDATE_STATUS";
pub const CUSTODY_TRANSFER: &str = "CUSTODY_TRANSFER";
pub const REGISTER_USER: &str = "REGISTER_USER";
pub const CREATE_USER: &str = "CREATE_USER";
pub const UPDATE_USER: &str = "UPDATE_USER";
pub const UPLOAD_EVIDENCE: &str = "UPLOAD_EVIDENCE";

/// One audit row to be written.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub user_id: Option<UserId>,
    pub action: &'a str,
    pub table_name: &'a str,
    pub record_id: Option<String>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<&'a str>,
}

impl<'a> AuditEntry<'a> {
    /// Start an entry for `action` on `table_name` by `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId, action: &'a str, table_name: &'a str) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            table_name,
            record_id: None,
            old_values: None,
            new_values: None,
            ip_address: None,
        }
    }

    #[must_use]
    pub fn record(mut self, id: impl ToString) -> Self {
        self.record_id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn old_values(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    #[must_use]
    pub fn new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }

    #[must_use]
    pub const fn ip(mut self, ip_address: Option<&'a str>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: AuditLogId,
    user_id: Option<UserId>,
    action: String,
    table_name: String,
    record_id: Option<String>,
    old_values: Option<Json<Value>>,
    new_values: Option<Json<Value>>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
    user_full_name: Option<String>,
    user_badge_number: Option<String>,
}

impl From<AuditRow> for AuditLog {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            table_name: row.table_name,
            record_id: row.record_id,
            old_values: row.old_values.map(|Json(v)| v),
            new_values: row.new_values.map(|Json(v)| v),
            ip_address: row.ip_address,
            created_at: row.created_at,
            user: row.user_full_name.map(|full_name| OfficerRef {
                full_name,
                badge_number: row.user_badge_number,
            }),
        }
    }
}

/// Write an audit row on any executor, so it can join the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert<'e, E>(executor: E, entry: &AuditEntry<'_>) -> Result<AuditLogId, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, AuditLogId>(
        "INSERT INTO cms.audit_logs \
           (user_id, action, table_name, record_id, old_values, new_values, ip_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.table_name)
    .bind(entry.record_id.as_deref())
    .bind(entry.old_values.as_ref().map(Json))
    .bind(entry.new_values.as_ref().map(Json))
    .bind(entry.ip_address)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Read access to the audit trail.
pub struct AuditRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditRepository<'a> {
    /// Hard cap on rows returned by a single listing.
    pub const MAX_LIMIT: i64 = 5000;

    pub const DEFAULT_LIMIT: i64 = 500;

    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent entries first, with the acting user's name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64) -> Result<Vec<AuditLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT a.id, a.user_id, a.action, a.table_name, a.record_id, \
                    a.old_values, a.new_values, a.ip_address, a.created_at, \
                    u.full_name AS user_full_name, u.badge_number AS user_badge_number \
             FROM cms.audit_logs a \
             LEFT JOIN cms.users u ON u.id = a.user_id \
             ORDER BY a.created_at DESC \
             LIMIT $1",
        )
        .bind(limit.clamp(1, Self::MAX_LIMIT))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(AuditLog::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let user = UserId::generate();
        let entry = AuditEntry::new(user, UPDATE_STATUS, "contraband_items")
            .record("abc")
            .old_values(serde_json::json!({ "status": "seized" }))
            .new_values(serde_json::json!({ "status": "in_custody" }))
            .ip(Some("10.0.0.7"));

        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.record_id.as_deref(), Some("abc"));
        assert_eq!(entry.ip_address, Some("10.0.0.7"));
        assert_eq!(entry.old_values, Some(serde_json::json!({ "status": "seized" })));
    }

    #[test]
    fn test_row_without_user_has_no_officer() {
        let row = AuditRow {
            id: AuditLogId::generate(),
            user_id: None,
            action: CREATE_SEIZURE.into(),
            table_name: "contraband_items".into(),
            record_id: None,
            old_values: None,
            new_values: Some(Json(serde_json::json!({ "seizure_number": "CMS-2024-000001" }))),
            ip_address: None,
            created_at: Utc::now(),
            user_full_name: None,
            user_badge_number: Some("ignored".into()),
        };
        let log = AuditLog::from(row);
        assert!(log.user.is_none());
        assert_eq!(log.actor_name(), "System");
        assert!(log.new_values.is_some());
    }
}
