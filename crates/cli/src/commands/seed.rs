//! Reference data seeding.

use cms_api::db::CategoryRepository;
use cms_api::db::categories::DEFAULT_CATEGORIES;

use super::{CommandError, connect};

/// Insert the default categories that are missing. Existing rows are left
/// untouched.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn categories() -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = CategoryRepository::new(&pool);

    let mut inserted = 0;
    for (name, description, risk_level) in DEFAULT_CATEGORIES {
        if repo.ensure(name, Some(description), risk_level).await? {
            tracing::info!(%name, risk = %risk_level, "Category added");
            inserted += 1;
        }
    }

    tracing::info!(
        inserted,
        existing = DEFAULT_CATEGORIES.len() - inserted,
        "Seeding complete!"
    );
    Ok(())
}
