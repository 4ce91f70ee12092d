//! # Event Database Handle
//!
//! ```text
//!   DbConfig::new("bazaar.db")           DbConfig::in_memory()
//!        │  WAL, busy timeout, 5 conns        │  one private connection
//!        └───────────────┬────────────────────┘
//!                        ▼
//!              Database::new(config)
//!                ├── PRAGMA foreign_keys = ON
//!                ├── migrations::migrate ──► schema version
//!                └── users() categories() items() sales() sessions()
//! ```
//!
//! Request tasks share the pool. SQLite still allows only one writer at a
//! time, so a writer that finds the database locked waits up to
//! `busy_timeout` before failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::category::CategoryRepository;
use crate::repository::item::ItemRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::session::SessionRepository;
use crate::repository::user::UserRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the event database lives and how the pool talks to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open; `:memory:` for a private database.
    pub database_path: PathBuf,

    /// Pool size. An in-memory database is bound to one connection.
    pub max_connections: u32,

    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// A fresh private database, gone when the pool closes. For tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        // Off by default in SQLite; the schema relies on them as a backstop
        options.foreign_keys(true).busy_timeout(self.busy_timeout)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the event database. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and migrates it to the embedded schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let max_connections = if config.is_in_memory() {
            1
        } else {
            config.max_connections.max(1)
        };
        debug!(path = %config.database_path.display(), max_connections, "Opening event database");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            // An in-memory database dies with its last connection
            .min_connections(if config.is_in_memory() { 1 } else { 0 })
            .idle_timeout(if config.is_in_memory() { None } else { Some(Duration::from_secs(600)) })
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let version = migrations::migrate(&pool).await?;
        info!(path = %config.database_path.display(), version, "Event database ready");

        Ok(Database { pool })
    }

    /// Underlying pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// The item lifecycle guard.
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone())
    }

    /// The sale transaction manager.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// The session store.
    pub fn sessions(&self) -> SessionRepository {
        SessionRepository::new(self.pool.clone())
    }

    /// Newest applied schema migration.
    pub async fn schema_version(&self) -> DbResult<Option<i64>> {
        migrations::schema_version(&self.pool).await
    }

    /// Whether the database still answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Waits for checked-out connections and closes the pool. Every later
    /// repository call fails.
    pub async fn close(&self) {
        info!("Closing event database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_migrates_to_latest_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.schema_version().await.unwrap(), Some(migrations::latest_version()));

        let roles: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY role_id")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(roles, ["admin", "seller", "cashier"]);

        // Applying again is a no-op
        assert_eq!(
            migrations::migrate(db.pool()).await.unwrap(),
            migrations::latest_version()
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let path = std::env::temp_dir().join(format!("bazaar-pool-{}.db", uuid::Uuid::new_v4().simple()));

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(journal, "wal");
        db.categories().add_with_id(1, "Toys").await.unwrap();
        db.close().await;

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.categories().get(1).await.unwrap().name, "Toys");
        reopened.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn test_unmigrated_database_has_no_version() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await
            .unwrap();
        assert_eq!(migrations::schema_version(&pool).await.unwrap(), None);
    }

    #[test]
    fn test_config() {
        let config = DbConfig::new("/tmp/bazaar.db");
        assert_eq!(config.max_connections, 5);
        assert!(!config.is_in_memory());

        let config = DbConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
    }
}
