//! Event database schema, embedded from `migrations/sqlite/`.
//!
//! ```text
//! 001_initial_schema.sql   roles, users, item_categories, items,
//!                          sales, sale_items, sessions
//! ```
//!
//! Files are applied in version order and recorded in `_sqlx_migrations`.
//! Applied files must never change; schema changes go in a new `NNN_*.sql`.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Version of the newest embedded migration.
pub fn latest_version() -> i64 {
    MIGRATOR
        .iter()
        .map(|migration| migration.version)
        .max()
        .unwrap_or(0)
}

/// Brings the schema up to [`latest_version`] and returns the version the
/// database is at afterwards.
pub async fn migrate(pool: &SqlitePool) -> DbResult<i64> {
    MIGRATOR.run(pool).await?;

    let version = schema_version(pool)
        .await?
        .ok_or_else(|| DbError::MigrationFailed("no migration recorded".to_string()))?;
    info!(version, "Schema up to date");
    Ok(version)
}

/// Newest successfully applied migration, `None` on an unmigrated database.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<Option<i64>> {
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master \
         WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;
    if !tracked {
        return Ok(None);
    }

    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await?;
    Ok(version)
}
