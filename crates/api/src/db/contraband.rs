//! Contraband item repository.
//!
//! Registration and status changes run in a transaction together with the
//! custody and audit rows they imply.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use cms_core::records::{CategoryRef, ContrabandItem, NewContrabandItem, OfficerRef};
use cms_core::{CategoryId, ContrabandId, ItemStatus, RiskLevel, UserId};

use super::RepositoryError;
use super::audit::{self, AuditEntry};

/// Reason recorded on the custody row created with every seizure.
pub const INITIAL_CUSTODY_REASON: &str = "Initial seizure";
/// Notes recorded on the custody row created with every seizure.
pub const INITIAL_CUSTODY_NOTES: &str = "Item seized and registered in system";

const ITEM_SELECT: &str = "SELECT i.id, i.seizure_number, i.category_id, i.item_name, \
         i.description, i.quantity, i.unit, i.estimated_value, i.weight_kg, i.status, \
         i.seizure_date, i.seizure_location, i.gps_latitude, i.gps_longitude, i.seized_by, \
         i.case_number, i.court_case_number, i.barcode, i.rfid_tag, i.storage_location, \
         i.created_at, i.updated_at, \
         c.name AS category_name, c.risk_level AS category_risk_level, \
         u.full_name AS seized_by_full_name, u.badge_number AS seized_by_badge_number \
     FROM cms.contraband_items i \
     LEFT JOIN cms.contraband_categories c ON c.id = i.category_id \
     LEFT JOIN cms.users u ON u.id = i.seized_by";

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: ContrabandId,
    seizure_number: String,
    category_id: Option<CategoryId>,
    item_name: String,
    description: Option<String>,
    quantity: Decimal,
    unit: Option<String>,
    estimated_value: Option<Decimal>,
    weight_kg: Option<Decimal>,
    status: ItemStatus,
    seizure_date: DateTime<Utc>,
    seizure_location: String,
    gps_latitude: Option<f64>,
    gps_longitude: Option<f64>,
    seized_by: Option<UserId>,
    case_number: Option<String>,
    court_case_number: Option<String>,
    barcode: Option<String>,
    rfid_tag: Option<String>,
    storage_location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    category_risk_level: Option<RiskLevel>,
    seized_by_full_name: Option<String>,
    seized_by_badge_number: Option<String>,
}

impl From<ItemRow> for ContrabandItem {
    fn from(row: ItemRow) -> Self {
        let category = match (row.category_name, row.category_risk_level) {
            (Some(name), Some(risk_level)) => Some(CategoryRef { name, risk_level }),
            _ => None,
        };
        Self {
            id: row.id,
            seizure_number: row.seizure_number,
            category_id: row.category_id,
            item_name: row.item_name,
            description: row.description,
            quantity: row.quantity,
            unit: row.unit,
            estimated_value: row.estimated_value,
            weight_kg: row.weight_kg,
            status: row.status,
            seizure_date: row.seizure_date,
            seizure_location: row.seizure_location,
            gps_latitude: row.gps_latitude,
            gps_longitude: row.gps_longitude,
            seized_by: row.seized_by,
            case_number: row.case_number,
            court_case_number: row.court_case_number,
            barcode: row.barcode,
            rfid_tag: row.rfid_tag,
            storage_location: row.storage_location,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category,
            seized_by_user: row.seized_by_full_name.map(|full_name| OfficerRef {
                full_name,
                badge_number: row.seized_by_badge_number,
            }),
        }
    }
}

/// Fetch one item on an open connection (used inside transactions).
async fn fetch_item(
    conn: &mut PgConnection,
    id: ContrabandId,
) -> Result<Option<ContrabandItem>, RepositoryError> {
    let sql = format!("{ITEM_SELECT} WHERE i.id = $1");
    let row = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(ContrabandItem::from))
}

/// Lock an item row and return its current status.
pub(crate) async fn lock_status(
    conn: &mut PgConnection,
    id: ContrabandId,
) -> Result<ItemStatus, RepositoryError> {
    sqlx::query_scalar::<_, ItemStatus>(
        "SELECT status FROM cms.contraband_items WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Repository for contraband items.
pub struct ContrabandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContrabandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Items newest seizure first, optionally only those seized by one officer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        seized_by: Option<UserId>,
    ) -> Result<Vec<ContrabandItem>, RepositoryError> {
        let sql = format!(
            "{ITEM_SELECT} \
             WHERE ($1::uuid IS NULL OR i.seized_by = $1) \
             ORDER BY i.seizure_date DESC, i.created_at DESC"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(seized_by)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(ContrabandItem::from).collect())
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ContrabandId) -> Result<Option<ContrabandItem>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_item(&mut conn, id).await
    }

    /// Register a seizure.
    ///
    /// Inserts the item with status `seized`, the initial custody record to
    /// the seizing officer, and a `CREATE_SEIZURE` audit row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the seizure number is taken.
    /// Returns `RepositoryError::InvalidReference` for an unknown category.
    pub async fn create(
        &self,
        item: &NewContrabandItem,
        seizure_number: &str,
        seized_by: UserId,
        ip_address: Option<&str>,
    ) -> Result<ContrabandItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ContrabandId>(
            "INSERT INTO cms.contraband_items \
               (seizure_number, category_id, item_name, description, quantity, unit, \
                estimated_value, weight_kg, status, seizure_date, seizure_location, \
                gps_latitude, gps_longitude, seized_by, case_number, court_case_number, \
                barcode, rfid_tag, storage_location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'seized', COALESCE($9, now()), $10, \
                     $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING id",
        )
        .bind(seizure_number)
        .bind(item.category_id)
        .bind(item.item_name.trim())
        .bind(item.description.as_deref())
        .bind(item.quantity)
        .bind(item.unit.as_deref())
        .bind(item.estimated_value)
        .bind(item.weight_kg)
        .bind(item.seizure_date)
        .bind(item.seizure_location.trim())
        .bind(item.gps_latitude)
        .bind(item.gps_longitude)
        .bind(seized_by)
        .bind(item.case_number.as_deref())
        .bind(item.court_case_number.as_deref())
        .bind(item.barcode.as_deref())
        .bind(item.rfid_tag.as_deref())
        .bind(item.storage_location.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "seizure number already exists"))?;

        sqlx::query(
            "INSERT INTO cms.custody_chain \
               (contraband_id, from_user_id, to_user_id, transfer_reason, location, notes) \
             VALUES ($1, NULL, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(seized_by)
        .bind(INITIAL_CUSTODY_REASON)
        .bind(item.seizure_location.trim())
        .bind(INITIAL_CUSTODY_NOTES)
        .execute(&mut *tx)
        .await?;

        let entry = AuditEntry::new(seized_by, audit::CREATE_SEIZURE, "contraband_items")
            .record(id)
            .new_values(json!({
                "seizure_number": seizure_number,
                "item_name": item.item_name.trim(),
                "quantity": item.quantity,
                "unit": item.unit,
                "status": ItemStatus::Seized,
            }))
            .ip(ip_address);
        audit::insert(&mut *tx, &entry).await?;

        let created = fetch_item(&mut tx, id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("item {id} vanished after insert"))
        })?;

        tx.commit().await?;
        Ok(created)
    }

    /// Move an item to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Transition` if the change is not allowed.
    pub async fn update_status(
        &self,
        id: ContrabandId,
        status: ItemStatus,
        actor: UserId,
        ip_address: Option<&str>,
    ) -> Result<ContrabandItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = lock_status(&mut tx, id).await?;
        current.check_transition(status)?;

        sqlx::query("UPDATE cms.contraband_items SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let entry = AuditEntry::new(actor, audit::UPDATE_STATUS, "contraband_items")
            .record(id)
            .old_values(json!({ "status": current }))
            .new_values(json!({ "status": status }))
            .ip(ip_address);
        audit::insert(&mut *tx, &entry).await?;

        let updated = fetch_item(&mut tx, id).await?.ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(updated)
    }
}
