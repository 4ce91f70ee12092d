//! # Category Repository
//!
//! Item categories. Categories are created by administrators (or by the
//! seed binary) and never deleted once items reference them.

use bazaar_core::validation::validate_category_name;
use bazaar_core::{
    Category, CategoryCount, CategorySaleTotal, CoreError, Id, ItemSelection, DEFAULT_CATEGORIES,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::item_source;
use crate::transaction::finish;

/// Repository for item category operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category with an explicit id.
    ///
    /// ## Errors
    /// - `InvalidCategoryName` for an empty name
    /// - `CategoryIdAlreadyInUse` if the id is taken
    /// - `DbError::UniqueViolation` if the name is taken
    pub async fn add_with_id(&self, category_id: Id, name: &str) -> DbResult<()> {
        validate_category_name(name)?;

        let mut tx = self.pool.begin().await?;
        let result = insert_category(&mut tx, category_id, name).await;
        finish(tx, result).await?;

        info!(category_id, name, "Category created");
        Ok(())
    }

    /// Creates a category with a store-assigned id and returns that id.
    pub async fn add(&self, name: &str) -> DbResult<Id> {
        validate_category_name(name)?;

        let result = sqlx::query("INSERT INTO item_categories (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let category_id = result.last_insert_rowid();
        info!(category_id, name, "Category created");
        Ok(category_id)
    }

    /// Inserts the default categories that are not present yet.
    ///
    /// Returns how many were inserted.
    pub async fn add_defaults(&self) -> DbResult<u64> {
        let mut inserted = 0;
        for &(category_id, name) in DEFAULT_CATEGORIES {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO item_categories (item_category_id, name) VALUES (?1, ?2)",
            )
            .bind(category_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Gets a category by id.
    pub async fn get(&self, category_id: Id) -> DbResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT item_category_id AS category_id, name FROM item_categories \
             WHERE item_category_id = ?1",
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        category.ok_or_else(|| CoreError::NoSuchCategory(category_id).into())
    }

    /// Whether a category with this id exists.
    pub async fn exists(&self, category_id: Id) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        category_exists(&mut conn, category_id).await
    }

    /// Lists all categories ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT item_category_id AS category_id, name FROM item_categories \
             ORDER BY item_category_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Number of items of `selection` per category, empty categories included.
    pub async fn counts(&self, selection: ItemSelection) -> DbResult<Vec<CategoryCount>> {
        let sql = format!(
            "SELECT c.item_category_id AS category_id, c.name, COUNT(i.item_id) AS count \
             FROM item_categories c \
             LEFT JOIN {} i ON i.item_category_id = c.item_category_id \
             GROUP BY c.item_category_id \
             ORDER BY c.item_category_id",
            item_source(selection)
        );
        let counts = sqlx::query_as::<_, CategoryCount>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(counts)
    }

    /// Items sold and revenue per category, categories without sales
    /// included. An item sold twice counts twice.
    pub async fn sales_overview(&self) -> DbResult<Vec<CategorySaleTotal>> {
        let totals = sqlx::query_as::<_, CategorySaleTotal>(
            "SELECT c.item_category_id AS category_id, c.name, \
                    COUNT(sold.item_id) AS sold_count, \
                    COALESCE(SUM(sold.price_in_cents), 0) AS total_in_cents \
             FROM item_categories c \
             LEFT JOIN ( \
                 SELECT i.item_id, i.item_category_id, i.price_in_cents \
                 FROM items i JOIN sale_items si ON si.item_id = i.item_id \
             ) sold ON sold.item_category_id = c.item_category_id \
             GROUP BY c.item_category_id \
             ORDER BY c.item_category_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(totals)
    }
}

async fn insert_category(conn: &mut SqliteConnection, category_id: Id, name: &str) -> DbResult<()> {
    if category_exists(conn, category_id).await? {
        return Err(CoreError::CategoryIdAlreadyInUse(category_id).into());
    }

    sqlx::query("INSERT INTO item_categories (item_category_id, name) VALUES (?1, ?2)")
        .bind(category_id)
        .bind(name)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn category_exists(conn: &mut SqliteConnection, category_id: Id) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM item_categories WHERE item_category_id = ?1)",
    )
    .bind(category_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

// =============================================================================
// Unit Tests
// =============================================================================
