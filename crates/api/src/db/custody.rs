//! Chain-of-custody repository.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;

use cms_core::records::{CustodyRecord, NewCustodyTransfer, OfficerRef};
use cms_core::validate::is_destruction_transfer;
use cms_core::{ContrabandId, CustodyRecordId, ItemStatus, TransitionError, UserId};

use super::RepositoryError;
use super::audit::{self, AuditEntry};
use super::contraband::lock_status;

#[derive(Debug, sqlx::FromRow)]
struct CustodyRow {
    id: CustodyRecordId,
    contraband_id: ContrabandId,
    from_user_id: Option<UserId>,
    to_user_id: UserId,
    transfer_reason: String,
    transfer_date: DateTime<Utc>,
    location: Option<String>,
    notes: Option<String>,
    from_full_name: Option<String>,
    from_badge_number: Option<String>,
    to_full_name: Option<String>,
    to_badge_number: Option<String>,
}

impl From<CustodyRow> for CustodyRecord {
    fn from(row: CustodyRow) -> Self {
        Self {
            id: row.id,
            contraband_id: row.contraband_id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            transfer_reason: row.transfer_reason,
            transfer_date: row.transfer_date,
            location: row.location,
            notes: row.notes,
            from_user: row.from_full_name.map(|full_name| OfficerRef {
                full_name,
                badge_number: row.from_badge_number,
            }),
            to_user: row.to_full_name.map(|full_name| OfficerRef {
                full_name,
                badge_number: row.to_badge_number,
            }),
        }
    }
}

/// Result of a recorded transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub id: CustodyRecordId,
    /// Set when the transfer moved the item to `pending_destruction`.
    pub new_status: Option<ItemStatus>,
}

/// Repository for custody transfers.
pub struct CustodyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustodyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The custody chain of an item, most recent transfer first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_item(
        &self,
        contraband_id: ContrabandId,
    ) -> Result<Vec<CustodyRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustodyRow>(
            "SELECT c.id, c.contraband_id, c.from_user_id, c.to_user_id, c.transfer_reason, \
                    c.transfer_date, c.location, c.notes, \
                    f.full_name AS from_full_name, f.badge_number AS from_badge_number, \
                    t.full_name AS to_full_name, t.badge_number AS to_badge_number \
             FROM cms.custody_chain c \
             LEFT JOIN cms.users f ON f.id = c.from_user_id \
             LEFT JOIN cms.users t ON t.id = c.to_user_id \
             WHERE c.contraband_id = $1 \
             ORDER BY c.transfer_date DESC",
        )
        .bind(contraband_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(CustodyRecord::from).collect())
    }

    /// Record a hand-over from `from_user` to the transfer's recipient.
    ///
    /// Also moves the item's storage location to the transfer location, and
    /// flags the item for destruction when the reason says so.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Transition` if the item is destroyed or released.
    /// Returns `RepositoryError::InvalidReference` if the recipient is unknown or inactive.
    pub async fn transfer(
        &self,
        transfer: &NewCustodyTransfer,
        from_user: UserId,
        ip_address: Option<&str>,
    ) -> Result<TransferOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status = lock_status(&mut tx, transfer.contraband_id).await?;
        if status.is_terminal() {
            return Err(TransitionError::Terminal(status).into());
        }

        let recipient_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM cms.users WHERE id = $1",
        )
        .bind(transfer.to_user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if recipient_active != Some(true) {
            return Err(RepositoryError::InvalidReference(
                "recipient is not an active user".to_owned(),
            ));
        }

        let location = transfer.location.trim();
        let id = sqlx::query_scalar::<_, CustodyRecordId>(
            "INSERT INTO cms.custody_chain \
               (contraband_id, from_user_id, to_user_id, transfer_reason, location, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(transfer.contraband_id)
        .bind(from_user)
        .bind(transfer.to_user_id)
        .bind(transfer.transfer_reason.trim())
        .bind(location)
        .bind(transfer.notes.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "duplicate custody record"))?;

        let new_status = (is_destruction_transfer(&transfer.transfer_reason)
            && status != ItemStatus::PendingDestruction)
            .then_some(ItemStatus::PendingDestruction);

        sqlx::query(
            "UPDATE cms.contraband_items \
             SET storage_location = $2, status = COALESCE($3, status), updated_at = now() \
             WHERE id = $1",
        )
        .bind(transfer.contraband_id)
        .bind(location)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        let mut new_values = json!({
            "contraband_id": transfer.contraband_id,
            "from_user_id": from_user,
            "to_user_id": transfer.to_user_id,
            "transfer_reason": transfer.transfer_reason.trim(),
            "location": location,
        });
        if let (Some(next), Some(values)) = (new_status, new_values.as_object_mut()) {
            values.insert("status".to_owned(), json!(next));
        }
        let entry = AuditEntry::new(from_user, audit::CUSTODY_TRANSFER, "custody_chain")
            .record(id)
            .old_values(json!({ "status": status }))
            .new_values(new_values)
            .ip(ip_address);
        audit::insert(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(TransferOutcome { id, new_status })
    }
}
