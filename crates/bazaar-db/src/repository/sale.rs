//! # Sale Repository (Sale Transaction Manager)
//!
//! Database operations for sales and their item lists.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. VALIDATE (no store access)                                         │
//! │     └── item ids non-empty, no id twice                                │
//! │                                                                         │
//! │  2. BEGIN                                                              │
//! │     └── cashier exists and is a cashier                                │
//! │     └── every item exists and is not hidden                            │
//! │                                                                         │
//! │  3. WRITE                                                              │
//! │     └── INSERT sales                                                   │
//! │     └── INSERT sale_items (one per item)                               │
//! │                                                                         │
//! │  4. COMMIT ── or, on any error, ROLLBACK and return it unchanged       │
//! │                                                                         │
//! │  (LATER) remove_sale() → DELETE sale_items, DELETE sales (one tx)      │
//! │          items themselves are never touched                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A caller never observes a sale with only part of its items persisted.

use bazaar_core::validation::validate_sale_items;
use bazaar_core::{CoreError, Id, Item, MultiplySoldItem, Role, Sale, SaleSummary, Timestamp};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::item::fetch_item;
use crate::repository::user::{ensure_role, fetch_user};
use crate::repository::ITEM_COLUMNS;
use crate::transaction::finish;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Records a sale of `item_ids` by `cashier_id` and returns its id.
    ///
    /// ## Errors (checked before any write)
    /// - `SaleMissingItems` for an empty list
    /// - `DuplicateItemInSale` if an id appears twice
    /// - `NoSuchUser` / `SaleRequiresCashier` for the cashier
    /// - `NoSuchItem` / `ItemHidden` for the items
    pub async fn add_sale(
        &self,
        cashier_id: Id,
        transaction_time: Timestamp,
        item_ids: &[Id],
    ) -> DbResult<Id> {
        validate_sale_items(item_ids)?;

        let mut tx = self.pool.begin().await?;
        let result = insert_sale(&mut tx, cashier_id, transaction_time, item_ids).await;
        let sale_id = finish(tx, result).await?;

        info!(sale_id, cashier_id, items = item_ids.len(), "Sale recorded");
        Ok(sale_id)
    }

    /// Removes a sale and its item list. Items are left untouched.
    pub async fn remove_sale(&self, sale_id: Id) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = delete_sale(&mut tx, sale_id).await;
        finish(tx, result).await?;

        info!(sale_id, "Sale removed");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale header by id.
    pub async fn get_sale(&self, sale_id: Id) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::NoSuchSale(sale_id).into())
    }

    /// Whether a sale with this id exists.
    pub async fn exists(&self, sale_id: Id) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_sale(&mut conn, sale_id).await?.is_some())
    }

    /// Items of a sale, ordered by item id.
    pub async fn get_sale_items(&self, sale_id: Id) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        if fetch_sale(&mut conn, sale_id).await?.is_none() {
            return Err(CoreError::NoSuchSale(sale_id).into());
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items i \
             INNER JOIN sale_items si ON si.item_id = i.item_id \
             WHERE si.sale_id = ?1 \
             ORDER BY i.item_id"
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(items)
    }

    /// All sales with their item count and total price.
    pub async fn list_summaries(&self) -> DbResult<Vec<SaleSummary>> {
        let summaries = sqlx::query_as::<_, SaleSummary>(
            "SELECT s.sale_id, s.cashier_id, s.transaction_time, \
                    COUNT(i.item_id) AS item_count, \
                    COALESCE(SUM(i.price_in_cents), 0) AS total_price_in_cents \
             FROM sales s \
             INNER JOIN sale_items si ON si.sale_id = s.sale_id \
             INNER JOIN items i ON i.item_id = si.item_id \
             GROUP BY s.sale_id \
             ORDER BY s.transaction_time, s.sale_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    /// Sales recorded by a cashier, by transaction time then id.
    ///
    /// Fails with `NoSuchUser` / `WrongRole` unless `cashier_id` is a cashier.
    pub async fn get_sales_with_cashier(&self, cashier_id: Id) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, cashier_id, Role::Cashier).await?;

        let sales = sqlx::query_as::<_, Sale>(
            "SELECT sale_id, cashier_id, transaction_time FROM sales \
             WHERE cashier_id = ?1 \
             ORDER BY transaction_time, sale_id",
        )
        .bind(cashier_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(sales)
    }

    /// Ids of the sales containing an item, ascending.
    pub async fn get_sales_with_item(&self, item_id: Id) -> DbResult<Vec<Id>> {
        let mut conn = self.pool.acquire().await?;
        if fetch_item(&mut conn, item_id).await?.is_none() {
            return Err(CoreError::NoSuchItem(item_id).into());
        }

        let sale_ids: Vec<Id> = sqlx::query_scalar(
            "SELECT sale_id FROM sale_items WHERE item_id = ?1 ORDER BY sale_id",
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(sale_ids)
    }

    /// Every item sold at least once, most recent sale first.
    pub async fn get_sold_items(&self) -> DbResult<Vec<Item>> {
        let sql = sold_items_query("");
        let items = sqlx::query_as::<_, Item>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Items sold by one cashier, most recent sale first.
    ///
    /// Fails with `NoSuchUser` / `WrongRole` unless `cashier_id` is a cashier.
    pub async fn get_items_sold_by(&self, cashier_id: Id) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, cashier_id, Role::Cashier).await?;

        let sql = sold_items_query("WHERE s.cashier_id = ?1");
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(cashier_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(items)
    }

    /// Whether any of the items appears in a sale.
    pub async fn has_any_been_sold(&self, item_ids: &[Id]) -> DbResult<bool> {
        if item_ids.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM sale_items WHERE item_id IN (");
        let mut separated = query.separated(", ");
        for &item_id in item_ids {
            separated.push_bind(item_id);
        }
        separated.push_unseparated("))");

        let sold: bool = query
            .build_query_scalar::<bool>()
            .fetch_one(&self.pool)
            .await?;
        Ok(sold)
    }

    /// Items that appear in more than one sale, with those sales.
    ///
    /// Ordered by item id; each item's sales by sale id.
    pub async fn get_multiply_sold_items(&self) -> DbResult<Vec<MultiplySoldItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS}, s.sale_id, s.cashier_id, s.transaction_time \
             FROM items i \
             INNER JOIN sale_items si ON si.item_id = i.item_id \
             INNER JOIN sales s ON s.sale_id = si.sale_id \
             WHERE i.item_id IN ( \
                 SELECT item_id FROM sale_items GROUP BY item_id HAVING COUNT(*) > 1 \
             ) \
             ORDER BY i.item_id, s.sale_id"
        );
        let rows = sqlx::query_as::<_, MultiplySoldRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut result: Vec<MultiplySoldItem> = Vec::new();
        for row in rows {
            let sale = Sale {
                sale_id: row.sale_id,
                cashier_id: row.cashier_id,
                transaction_time: row.transaction_time,
            };
            match result.last_mut() {
                Some(last) if last.item.item_id == row.item.item_id => last.sales.push(sale),
                _ => result.push(MultiplySoldItem {
                    item: row.item,
                    sales: vec![sale],
                }),
            }
        }
        Ok(result)
    }
}

#[derive(sqlx::FromRow)]
struct MultiplySoldRow {
    #[sqlx(flatten)]
    item: Item,
    sale_id: Id,
    cashier_id: Id,
    transaction_time: Timestamp,
}

fn sold_items_query(filter: &str) -> String {
    format!(
        "SELECT {ITEM_COLUMNS} FROM items i \
         INNER JOIN sale_items si ON si.item_id = i.item_id \
         INNER JOIN sales s ON s.sale_id = si.sale_id \
         {filter} \
         GROUP BY i.item_id \
         ORDER BY MAX(s.transaction_time) DESC, i.item_id ASC"
    )
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, sale_id: Id) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        "SELECT sale_id, cashier_id, transaction_time FROM sales WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_optional(conn)
    .await?;
    Ok(sale)
}

async fn insert_sale(
    conn: &mut SqliteConnection,
    cashier_id: Id,
    transaction_time: Timestamp,
    item_ids: &[Id],
) -> DbResult<Id> {
    let cashier = fetch_user(conn, cashier_id)
        .await?
        .ok_or(CoreError::NoSuchUser(cashier_id))?;
    if cashier.role != Role::Cashier {
        return Err(CoreError::SaleRequiresCashier(cashier_id).into());
    }

    for &item_id in item_ids {
        let item = fetch_item(conn, item_id)
            .await?
            .ok_or(CoreError::NoSuchItem(item_id))?;
        if !item.is_sellable() {
            return Err(CoreError::ItemHidden(item_id).into());
        }
    }

    let result = sqlx::query("INSERT INTO sales (cashier_id, transaction_time) VALUES (?1, ?2)")
        .bind(cashier_id)
        .bind(transaction_time)
        .execute(&mut *conn)
        .await?;
    let sale_id = result.last_insert_rowid();

    for &item_id in item_ids {
        debug!(sale_id, item_id, "Adding item to sale");
        sqlx::query("INSERT INTO sale_items (sale_id, item_id) VALUES (?1, ?2)")
            .bind(sale_id)
            .bind(item_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(sale_id)
}

async fn delete_sale(conn: &mut SqliteConnection, sale_id: Id) -> DbResult<()> {
    if fetch_sale(conn, sale_id).await?.is_none() {
        return Err(CoreError::NoSuchSale(sale_id).into());
    }

    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM sales WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() != 1 {
        return Err(DbError::Internal(format!(
            "Deleting sale {} affected {} rows",
            sale_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
