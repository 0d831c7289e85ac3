//! Evidence file metadata. File contents live on disk under the upload directory.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;

use cms_core::records::EvidenceFile;
use cms_core::{ContrabandId, EvidenceFileId, ItemStatus, TransitionError, UserId};

use super::RepositoryError;
use super::audit::{self, AuditEntry};
use super::contraband::lock_status;

#[derive(Debug, sqlx::FromRow)]
struct EvidenceFileRow {
    id: EvidenceFileId,
    contraband_id: ContrabandId,
    file_name: String,
    file_type: Option<String>,
    file_size: Option<i64>,
    file_url: String,
    uploaded_by: Option<UserId>,
    description: Option<String>,
    uploaded_at: DateTime<Utc>,
}

impl From<EvidenceFileRow> for EvidenceFile {
    fn from(row: EvidenceFileRow) -> Self {
        Self {
            id: row.id,
            contraband_id: row.contraband_id,
            file_name: row.file_name,
            file_type: row.file_type,
            file_size: row.file_size,
            file_url: row.file_url,
            uploaded_by: row.uploaded_by,
            description: row.description,
            uploaded_at: row.uploaded_at,
        }
    }
}

/// Metadata of a stored upload.
#[derive(Debug, Clone)]
pub struct NewEvidenceFile<'a> {
    pub contraband_id: ContrabandId,
    pub file_name: &'a str,
    pub file_type: Option<&'a str>,
    pub file_size: i64,
    pub file_url: &'a str,
    pub description: Option<&'a str>,
}

/// Evidence may be attached until the item is destroyed or released.
fn accepts_evidence(status: ItemStatus) -> Result<(), TransitionError> {
    if status.is_terminal() {
        Err(TransitionError::Terminal(status))
    } else {
        Ok(())
    }
}

/// Repository for evidence file metadata.
pub struct EvidenceFileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EvidenceFileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Files attached to an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_item(
        &self,
        contraband_id: ContrabandId,
    ) -> Result<Vec<EvidenceFile>, RepositoryError> {
        let rows = sqlx::query_as::<_, EvidenceFileRow>(
            "SELECT id, contraband_id, file_name, file_type, file_size, file_url, \
                    uploaded_by, description, uploaded_at \
             FROM cms.evidence_files \
             WHERE contraband_id = $1 \
             ORDER BY uploaded_at",
        )
        .bind(contraband_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(EvidenceFile::from).collect())
    }

    /// Record an uploaded file and its `UPLOAD_EVIDENCE` audit row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Transition` if the item is destroyed or released.
    pub async fn create(
        &self,
        file: &NewEvidenceFile<'_>,
        uploaded_by: UserId,
        ip_address: Option<&str>,
    ) -> Result<EvidenceFileId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        accepts_evidence(lock_status(&mut tx, file.contraband_id).await?)?;

        let id = sqlx::query_scalar::<_, EvidenceFileId>(
            "INSERT INTO cms.evidence_files \
               (contraband_id, file_name, file_type, file_size, file_url, uploaded_by, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(file.contraband_id)
        .bind(file.file_name)
        .bind(file.file_type)
        .bind(file.file_size)
        .bind(file.file_url)
        .bind(uploaded_by)
        .bind(file.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "file name already stored"))?;

        let entry = AuditEntry::new(uploaded_by, audit::UPLOAD_EVIDENCE, "evidence_files")
            .record(id)
            .new_values(json!({
                "contraband_id": file.contraband_id,
                "file_name": file.file_name,
                "file_type": file.file_type,
                "file_size": file.file_size,
            }))
            .ip(ip_address);
        audit::insert(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_items_accept_evidence() {
        for status in ItemStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(accepts_evidence(status), Ok(()), "{status:?}");
        }
    }

    #[test]
    fn test_closed_items_refuse_evidence() {
        assert_eq!(
            accepts_evidence(ItemStatus::Destroyed),
            Err(TransitionError::Terminal(ItemStatus::Destroyed))
        );
        assert_eq!(
            accepts_evidence(ItemStatus::Released),
            Err(TransitionError::Terminal(ItemStatus::Released))
        );
    }
}
