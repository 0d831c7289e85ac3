//! Contraband category reference data.

use sqlx::PgPool;

use cms_core::records::Category;
use cms_core::{CategoryId, RiskLevel};

use super::RepositoryError;

/// Categories every installation starts with: name, description, risk.
///
/// The seed migration inserts the same rows; `cms seed categories` restores
/// any that were removed.
pub const DEFAULT_CATEGORIES: [(&str, &str, RiskLevel); 10] = [
    ("Narcotics", "Illegal drugs and controlled substances", RiskLevel::Critical),
    ("Weapons", "Firearms, ammunition and explosives", RiskLevel::Critical),
    ("Counterfeit Goods", "Fake branded products and forged documents", RiskLevel::Medium),
    ("Currency", "Undeclared or counterfeit cash", RiskLevel::High),
    ("Electronics", "Smuggled phones, computers and components", RiskLevel::Medium),
    ("Wildlife Products", "Ivory, skins and protected species", RiskLevel::High),
    ("Khat", "Khat leaves moved outside licensed channels", RiskLevel::Low),
    ("Fuel", "Smuggled petroleum products", RiskLevel::Low),
    ("Pharmaceuticals", "Unlicensed or expired medicines", RiskLevel::High),
    ("Other", "Items outside the listed categories", RiskLevel::Medium),
];

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    risk_level: RiskLevel,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            risk_level: row.risk_level,
        }
    }
}

/// Repository for contraband categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, risk_level \
             FROM cms.contraband_categories \
             ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Insert a category unless one with the same name exists.
    ///
    /// Returns `true` when a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn ensure(
        &self,
        name: &str,
        description: Option<&str>,
        risk_level: RiskLevel,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO cms.contraband_categories (name, description, risk_level) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .bind(risk_level)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
