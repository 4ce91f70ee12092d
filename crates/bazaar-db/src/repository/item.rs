//! # Item Repository (Item Lifecycle Guard)
//!
//! Every write to the `items` table goes through this repository, which
//! checks the per-item invariants before touching any row.
//!
//! ## Item States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Item States                                     │
//! │                                                                         │
//! │       set_frozen(true)                      set_hidden(true)            │
//! │   ┌────────┐ ◄──────────── ┌────────┐ ────────────► ┌────────┐         │
//! │   │ FROZEN │               │ normal │               │ HIDDEN │         │
//! │   └────────┘ ────────────► └────────┘ ◄──────────── └────────┘         │
//! │       set_frozen(false)        ▲            set_hidden(false)           │
//! │                                │                                        │
//! │                          create lands here                              │
//! │                                                                         │
//! │   FROZEN: update rejected (ItemFrozen)                                 │
//! │   HIDDEN: not sellable (ItemHidden), only in All/Hidden listings        │
//! │   FROZEN ∧ HIDDEN: never (HiddenFrozenItem)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Create Checks (in order)
//! 1. seller exists (`NoSuchUser`) and is a seller (`WrongRole`)
//! 2. category exists (`NoSuchCategory`)
//! 3. price > 0 (`InvalidPrice`)
//! 4. description not blank (`InvalidItemDescription`)
//!
//! The checks and the insert share one transaction.

use std::collections::BTreeSet;

use bazaar_core::validation::{validate_item_description, validate_new_item, validate_price};
use bazaar_core::{
    CoreError, Id, Item, ItemFilter, ItemSelection, ItemUpdate, ItemWithSaleCount, MoneyInCents,
    NewItem, Role, SaleItemInfo, SellerSummary,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::category::category_exists;
use crate::repository::user::ensure_role;
use crate::repository::{item_source, ITEM_COLUMNS};
use crate::transaction::finish;

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates an item and returns its id.
    ///
    /// New items are always unfrozen and unhidden.
    pub async fn create(&self, item: &NewItem) -> DbResult<Id> {
        let mut tx = self.pool.begin().await?;
        let result = insert_item(&mut tx, item).await;
        let item_id = finish(tx, result).await?;

        info!(item_id, seller_id = item.seller_id, price = %item.price_in_cents, "Item created");
        Ok(item_id)
    }

    /// Applies a partial update; omitted fields stay untouched.
    ///
    /// ## Errors
    /// - `NoSuchItem` if absent
    /// - `ItemFrozen` if the item is frozen
    /// - `InvalidPrice` / `InvalidItemDescription` for bad supplied values
    /// - `NoSuchCategory` for an unknown supplied category
    pub async fn update(&self, item_id: Id, update: &ItemUpdate) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = update_item(&mut tx, item_id, update).await;
        finish(tx, result).await?;

        debug!(item_id, "Item updated");
        Ok(())
    }

    /// Freezes or unfreezes a batch of items, all or nothing.
    ///
    /// Freezing a hidden item fails the whole batch with `HiddenFrozenItem`.
    /// Unfreezing is always permitted.
    pub async fn set_frozen(&self, item_ids: &[Id], frozen: bool) -> DbResult<()> {
        let ids: BTreeSet<Id> = item_ids.iter().copied().collect();

        let mut tx = self.pool.begin().await?;
        let result = set_flag(&mut tx, &ids, Flag::Frozen, frozen).await;
        finish(tx, result).await?;

        info!(count = ids.len(), frozen, "Items frozen state changed");
        Ok(())
    }

    /// Hides or unhides a batch of items, all or nothing.
    ///
    /// Hiding a frozen item fails the whole batch with `HiddenFrozenItem`.
    /// Unhiding is always permitted.
    pub async fn set_hidden(&self, item_ids: &[Id], hidden: bool) -> DbResult<()> {
        let ids: BTreeSet<Id> = item_ids.iter().copied().collect();

        let mut tx = self.pool.begin().await?;
        let result = set_flag(&mut tx, &ids, Flag::Hidden, hidden).await;
        finish(tx, result).await?;

        info!(count = ids.len(), hidden, "Items hidden state changed");
        Ok(())
    }

    /// Removes an item that has never been sold.
    ///
    /// ## Errors
    /// - `NoSuchItem` if absent
    /// - `ItemHasSales` if any sale references it
    pub async fn remove(&self, item_id: Id) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = remove_item(&mut tx, item_id).await;
        finish(tx, result).await?;

        info!(item_id, "Item removed");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an item by id.
    pub async fn get(&self, item_id: Id) -> DbResult<Item> {
        let mut conn = self.pool.acquire().await?;
        require_item(&mut conn, item_id).await
    }

    /// Gets several items, in the order of `item_ids`.
    ///
    /// Fails with `NoSuchItem` on the first missing id.
    pub async fn get_many(&self, item_ids: &[Id]) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        let mut items = Vec::with_capacity(item_ids.len());
        for &item_id in item_ids {
            items.push(require_item(&mut conn, item_id).await?);
        }
        Ok(items)
    }

    /// Whether an item with this id exists.
    pub async fn exists(&self, item_id: Id) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_item(&mut conn, item_id).await?.is_some())
    }

    /// Whether the item is frozen.
    pub async fn is_frozen(&self, item_id: Id) -> DbResult<bool> {
        Ok(self.get(item_id).await?.frozen)
    }

    /// Whether the item is hidden.
    pub async fn is_hidden(&self, item_id: Id) -> DbResult<bool> {
        Ok(self.get(item_id).await?.hidden)
    }

    /// Lists the items of `selection`, ordered by `added_at` then id.
    pub async fn list(&self, selection: ItemSelection, filter: ItemFilter) -> DbResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} i \
             WHERE (?1 IS NULL OR i.seller_id = ?1) \
               AND (?2 IS NULL OR i.item_category_id = ?2) \
             ORDER BY i.added_at, i.item_id",
            item_source(selection)
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(filter.seller_id)
            .bind(filter.category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Counts the items of `selection`.
    pub async fn count(&self, selection: ItemSelection) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", item_source(selection));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Lists a seller's items of `selection`.
    ///
    /// Fails with `NoSuchUser` / `WrongRole` unless `seller_id` is a seller.
    pub async fn list_by_seller(
        &self,
        seller_id: Id,
        selection: ItemSelection,
    ) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, seller_id, Role::Seller).await?;

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} i \
             WHERE i.seller_id = ?1 \
             ORDER BY i.added_at, i.item_id",
            item_source(selection)
        );
        let items = sqlx::query_as::<_, Item>(&sql)
            .bind(seller_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(items)
    }

    /// Like [`list_by_seller`](Self::list_by_seller), with the number of
    /// sales each item appears in.
    pub async fn list_by_seller_with_sale_counts(
        &self,
        seller_id: Id,
        selection: ItemSelection,
    ) -> DbResult<Vec<ItemWithSaleCount>> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, seller_id, Role::Seller).await?;

        let sql = format!(
            "SELECT {ITEM_COLUMNS}, COUNT(si.sale_id) AS sale_count \
             FROM {} i \
             LEFT JOIN sale_items si ON si.item_id = i.item_id \
             WHERE i.seller_id = ?1 \
             GROUP BY i.item_id \
             ORDER BY i.added_at, i.item_id",
            item_source(selection)
        );
        let items = sqlx::query_as::<_, ItemWithSaleCount>(&sql)
            .bind(seller_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(items)
    }

    /// Checkout view of one item: price, category, and whether it was sold
    /// before. Hidden items are reported too so the cashier sees why a
    /// sale would be refused.
    pub async fn sale_info(&self, item_id: Id) -> DbResult<SaleItemInfo> {
        let info = sqlx::query_as::<_, SaleItemInfo>(
            "SELECT i.item_id, i.seller_id, i.description, i.price_in_cents, \
                    i.item_category_id AS category_id, i.hidden, \
                    COUNT(si.sale_id) AS sale_count, \
                    COUNT(si.sale_id) > 0 AS has_been_sold \
             FROM items i \
             LEFT JOIN sale_items si ON si.item_id = i.item_id \
             WHERE i.item_id = ?1 \
             GROUP BY i.item_id",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        info.ok_or_else(|| CoreError::NoSuchItem(item_id).into())
    }

    /// Number of a seller's items of `selection`.
    ///
    /// Fails with `NoSuchUser` / `WrongRole` unless `seller_id` is a seller.
    pub async fn seller_item_count(&self, seller_id: Id, selection: ItemSelection) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, seller_id, Role::Seller).await?;
        seller_count(&mut conn, seller_id, selection).await
    }

    /// Summed price of a seller's items of `selection`, zero without items.
    pub async fn seller_total_price(
        &self,
        seller_id: Id,
        selection: ItemSelection,
    ) -> DbResult<MoneyInCents> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, seller_id, Role::Seller).await?;
        seller_total(&mut conn, seller_id, selection).await
    }

    /// Item counts and visible total of one seller, read in one transaction.
    pub async fn seller_summary(&self, seller_id: Id) -> DbResult<SellerSummary> {
        let mut tx = self.pool.begin().await?;
        let result = summarize_seller(&mut tx, seller_id).await;
        finish(tx, result).await
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_item(conn: &mut SqliteConnection, item_id: Id) -> DbResult<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.item_id = ?1");
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(item_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub(crate) async fn require_item(conn: &mut SqliteConnection, item_id: Id) -> DbResult<Item> {
    fetch_item(conn, item_id)
        .await?
        .ok_or_else(|| CoreError::NoSuchItem(item_id).into())
}

async fn insert_item(conn: &mut SqliteConnection, item: &NewItem) -> DbResult<Id> {
    ensure_role(conn, item.seller_id, Role::Seller).await?;
    if !category_exists(conn, item.category_id).await? {
        return Err(CoreError::NoSuchCategory(item.category_id).into());
    }
    validate_new_item(item)?;

    let result = sqlx::query(
        "INSERT INTO items (added_at, description, price_in_cents, item_category_id, \
                            seller_id, donation, charity, frozen, hidden) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0)",
    )
    .bind(item.added_at)
    .bind(&item.description)
    .bind(item.price_in_cents)
    .bind(item.category_id)
    .bind(item.seller_id)
    .bind(item.donation)
    .bind(item.charity)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn seller_count(
    conn: &mut SqliteConnection,
    seller_id: Id,
    selection: ItemSelection,
) -> DbResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} i WHERE i.seller_id = ?1",
        item_source(selection)
    );
    let count: i64 = sqlx::query_scalar(&sql).bind(seller_id).fetch_one(conn).await?;
    Ok(count)
}

async fn seller_total(
    conn: &mut SqliteConnection,
    seller_id: Id,
    selection: ItemSelection,
) -> DbResult<MoneyInCents> {
    let sql = format!(
        "SELECT COALESCE(SUM(i.price_in_cents), 0) FROM {} i WHERE i.seller_id = ?1",
        item_source(selection)
    );
    let total: MoneyInCents = sqlx::query_scalar(&sql).bind(seller_id).fetch_one(conn).await?;
    Ok(total)
}

async fn summarize_seller(conn: &mut SqliteConnection, seller_id: Id) -> DbResult<SellerSummary> {
    ensure_role(conn, seller_id, Role::Seller).await?;

    let frozen_item_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE seller_id = ?1 AND frozen")
            .bind(seller_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(SellerSummary {
        item_count: seller_count(conn, seller_id, ItemSelection::Visible).await?,
        frozen_item_count,
        hidden_item_count: seller_count(conn, seller_id, ItemSelection::Hidden).await?,
        total_price_in_cents: seller_total(conn, seller_id, ItemSelection::Visible).await?,
    })
}

async fn update_item(conn: &mut SqliteConnection, item_id: Id, update: &ItemUpdate) -> DbResult<()> {
    let item = require_item(conn, item_id).await?;
    if item.frozen {
        return Err(CoreError::ItemFrozen(item_id).into());
    }
    if let Some(price) = update.price_in_cents {
        validate_price(price)?;
    }
    if let Some(description) = &update.description {
        validate_item_description(description)?;
    }
    if let Some(category_id) = update.category_id {
        if !category_exists(conn, category_id).await? {
            return Err(CoreError::NoSuchCategory(category_id).into());
        }
    }
    if update.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE items SET \
             added_at         = COALESCE(?1, added_at), \
             description      = COALESCE(?2, description), \
             price_in_cents   = COALESCE(?3, price_in_cents), \
             item_category_id = COALESCE(?4, item_category_id), \
             donation         = COALESCE(?5, donation), \
             charity          = COALESCE(?6, charity) \
         WHERE item_id = ?7",
    )
    .bind(update.added_at)
    .bind(update.description.as_deref())
    .bind(update.price_in_cents)
    .bind(update.category_id)
    .bind(update.donation)
    .bind(update.charity)
    .bind(item_id)
    .execute(conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Frozen,
    Hidden,
}

async fn set_flag(
    conn: &mut SqliteConnection,
    item_ids: &BTreeSet<Id>,
    flag: Flag,
    value: bool,
) -> DbResult<()> {
    for &item_id in item_ids {
        let item = require_item(conn, item_id).await?;
        let conflicts = match flag {
            Flag::Frozen => value && item.hidden,
            Flag::Hidden => value && item.frozen,
        };
        if conflicts {
            return Err(CoreError::HiddenFrozenItem(item_id).into());
        }
    }

    let sql = match flag {
        Flag::Frozen => "UPDATE items SET frozen = ?1 WHERE item_id = ?2",
        Flag::Hidden => "UPDATE items SET hidden = ?1 WHERE item_id = ?2",
    };
    for &item_id in item_ids {
        sqlx::query(sql)
            .bind(value)
            .bind(item_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn remove_item(conn: &mut SqliteConnection, item_id: Id) -> DbResult<()> {
    require_item(conn, item_id).await?;

    let sold: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sale_items WHERE item_id = ?1)")
            .bind(item_id)
            .fetch_one(&mut *conn)
            .await?;
    if sold {
        return Err(CoreError::ItemHasSales(item_id).into());
    }

    let result = sqlx::query("DELETE FROM items WHERE item_id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() != 1 {
        return Err(DbError::Internal(format!(
            "Deleting item {} affected {} rows",
            item_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::*;
    use bazaar_core::{Timestamp, ValidationError};

    fn assert_domain(err: DbError, expected: &str) {
        match err {
            DbError::Domain(core) => assert_eq!(core.tag(), expected, "{core}"),
            other => panic!("expected domain error {expected}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_item() {
        let db = event_db().await;
        let item_id = db.items().create(&new_item(SELLER, 1000)).await.unwrap();

        let item = db.items().get(item_id).await.unwrap();
        assert_eq!(item.description, "Shirt");
        assert_eq!(item.price_in_cents, MoneyInCents::from_cents(1000));
        assert_eq!(item.seller_id, SELLER);
        assert_eq!(item.category_id, TOYS);
        assert!(!item.frozen);
        assert!(!item.hidden);
    }

    #[tokio::test]
    async fn test_create_item_check_order() {
        let db = event_db().await;
        let items = db.items();

        // Seller checks come first, even with a bad price
        let mut item = new_item(999, 0);
        assert_domain(items.create(&item).await.unwrap_err(), "no_such_user");

        item.seller_id = CASHIER;
        assert_domain(items.create(&item).await.unwrap_err(), "wrong_role");

        item.seller_id = SELLER;
        item.category_id = 999;
        assert_domain(items.create(&item).await.unwrap_err(), "no_such_category");

        item.category_id = TOYS;
        item.description = String::new();
        assert_domain(items.create(&item).await.unwrap_err(), "invalid_price");

        item.price_in_cents = MoneyInCents::from_cents(1);
        assert_domain(items.create(&item).await.unwrap_err(), "invalid_item_description");

        assert_eq!(items.count(ItemSelection::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_checks_and_insert_share_transaction() {
        let db = event_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let item_id = insert_item(&mut tx, &new_item(SELLER, 1000)).await.unwrap();
        assert!(fetch_item(&mut tx, item_id).await.unwrap().is_some());
        tx.rollback().await.unwrap();

        assert!(!db.items().exists(item_id).await.unwrap());
        assert_eq!(db.items().count(ItemSelection::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let db = event_db().await;
        let item_id = add_item(&db, SELLER).await;

        let update = ItemUpdate {
            description: Some("Red shirt".to_string()),
            charity: Some(true),
            ..Default::default()
        };
        db.items().update(item_id, &update).await.unwrap();

        let item = db.items().get(item_id).await.unwrap();
        assert_eq!(item.description, "Red shirt");
        assert!(item.charity);
        assert!(!item.donation);
        assert_eq!(item.price_in_cents, MoneyInCents::from_cents(1000));
        assert_eq!(item.added_at, Timestamp::from_secs(0));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_values() {
        let db = event_db().await;
        let item_id = add_item(&db, SELLER).await;

        let update = ItemUpdate {
            description: Some("Changed".to_string()),
            price_in_cents: Some(MoneyInCents::zero()),
            ..Default::default()
        };
        let err = db.items().update(item_id, &update).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::InvalidPrice(0)))
        ));

        let update = ItemUpdate {
            category_id: Some(999),
            ..Default::default()
        };
        assert_domain(
            db.items().update(item_id, &update).await.unwrap_err(),
            "no_such_category",
        );

        let untouched = db.items().get(item_id).await.unwrap();
        assert_eq!(untouched.description, "Shirt");

        assert_domain(
            db.items().update(999, &ItemUpdate::default()).await.unwrap_err(),
            "no_such_item",
        );
    }

    #[tokio::test]
    async fn test_frozen_item_rejects_updates_until_unfrozen() {
        let db = event_db().await;
        let item_id = add_item(&db, SELLER).await;
        db.items().set_frozen(&[item_id], true).await.unwrap();
        assert!(db.items().is_frozen(item_id).await.unwrap());

        let update = ItemUpdate {
            description: Some("x".to_string()),
            ..Default::default()
        };
        let err = db.items().update(item_id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemFrozen(id)) if id == item_id));
        assert_eq!(db.items().get(item_id).await.unwrap().description, "Shirt");

        db.items().set_frozen(&[item_id], false).await.unwrap();
        db.items().update(item_id, &update).await.unwrap();
        assert_eq!(db.items().get(item_id).await.unwrap().description, "x");
    }

    #[tokio::test]
    async fn test_frozen_and_hidden_are_exclusive() {
        let db = event_db().await;
        let frozen = add_item(&db, SELLER).await;
        let hidden = add_item(&db, SELLER).await;
        let plain = add_item(&db, SELLER).await;
        db.items().set_frozen(&[frozen], true).await.unwrap();
        db.items().set_hidden(&[hidden], true).await.unwrap();

        let err = db.items().set_hidden(&[plain, frozen], true).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::HiddenFrozenItem(id)) if id == frozen));

        let err = db.items().set_frozen(&[plain, hidden], true).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::HiddenFrozenItem(id)) if id == hidden));

        // Nothing of the failed batches was applied
        let item = db.items().get(plain).await.unwrap();
        assert!(!item.frozen && !item.hidden);

        // Releasing is always allowed, even on items in the other state
        db.items().set_hidden(&[frozen, hidden], false).await.unwrap();
        db.items().set_frozen(&[frozen, hidden], false).await.unwrap();
        for item in db.items().list(ItemSelection::All, ItemFilter::default()).await.unwrap() {
            assert!(!(item.frozen && item.hidden));
        }
    }

    #[tokio::test]
    async fn test_bulk_toggle_missing_item_is_atomic() {
        let db = event_db().await;
        let item_id = add_item(&db, SELLER).await;

        let err = db.items().set_frozen(&[item_id, 999], true).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NoSuchItem(999))));
        assert!(!db.items().is_frozen(item_id).await.unwrap());

        // Repeated ids are applied once
        db.items().set_frozen(&[item_id, item_id], true).await.unwrap();
        assert!(db.items().is_frozen(item_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_selections_partition_items() {
        let db = event_db().await;
        let a = add_item(&db, SELLER).await;
        let b = add_item(&db, SELLER).await;
        let c = add_item(&db, OTHER_SELLER).await;
        db.items().set_hidden(&[b], true).await.unwrap();

        let ids = |items: Vec<Item>| items.into_iter().map(|i| i.item_id).collect::<Vec<_>>();
        let items = db.items();
        let none = ItemFilter::default();

        assert_eq!(ids(items.list(ItemSelection::All, none).await.unwrap()), vec![a, b, c]);
        assert_eq!(ids(items.list(ItemSelection::Visible, none).await.unwrap()), vec![a, c]);
        assert_eq!(ids(items.list(ItemSelection::Hidden, none).await.unwrap()), vec![b]);

        assert_eq!(items.count(ItemSelection::All).await.unwrap(), 3);
        assert_eq!(items.count(ItemSelection::Visible).await.unwrap(), 2);
        assert_eq!(items.count(ItemSelection::Hidden).await.unwrap(), 1);

        let by_seller = ItemFilter {
            seller_id: Some(SELLER),
            category_id: None,
        };
        assert_eq!(ids(items.list(ItemSelection::All, by_seller).await.unwrap()), vec![a, b]);

        let by_category = ItemFilter {
            seller_id: None,
            category_id: Some(1),
        };
        assert!(items.list(ItemSelection::All, by_category).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_seller() {
        let db = event_db().await;
        let a = add_item(&db, SELLER).await;
        add_item(&db, OTHER_SELLER).await;

        let items = db.items().list_by_seller(SELLER, ItemSelection::All).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, a);

        assert_domain(
            db.items()
                .list_by_seller(CASHIER, ItemSelection::All)
                .await
                .unwrap_err(),
            "wrong_role",
        );

        db.sales().add_sale(CASHIER, Timestamp::from_secs(5), &[a]).await.unwrap();
        db.sales().add_sale(OTHER_CASHIER, Timestamp::from_secs(6), &[a]).await.unwrap();
        let counted = db
            .items()
            .list_by_seller_with_sale_counts(SELLER, ItemSelection::Visible)
            .await
            .unwrap();
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[0].sale_count, 2);
    }

    #[tokio::test]
    async fn test_get_many() {
        let db = event_db().await;
        let a = add_item(&db, SELLER).await;
        let b = add_item(&db, SELLER).await;

        let items = db.items().get_many(&[b, a]).await.unwrap();
        assert_eq!(items[0].item_id, b);
        assert_eq!(items[1].item_id, a);

        assert_domain(db.items().get_many(&[a, 999]).await.unwrap_err(), "no_such_item");
    }

    #[tokio::test]
    async fn test_remove_item() {
        let db = event_db().await;
        let sold = add_item(&db, SELLER).await;
        let unsold = add_item(&db, SELLER).await;
        db.sales().add_sale(CASHIER, Timestamp::from_secs(1), &[sold]).await.unwrap();

        let err = db.items().remove(sold).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ItemHasSales(id)) if id == sold));
        assert!(db.items().exists(sold).await.unwrap());

        db.items().remove(unsold).await.unwrap();
        assert!(!db.items().exists(unsold).await.unwrap());

        assert_domain(db.items().remove(unsold).await.unwrap_err(), "no_such_item");
    }

    #[tokio::test]
    async fn test_sale_info() {
        let db = event_db().await;
        let item_id = db.items().create(&new_item(SELLER, 750)).await.unwrap();

        let info = db.items().sale_info(item_id).await.unwrap();
        assert_eq!(info.item_id, item_id);
        assert_eq!(info.seller_id, SELLER);
        assert_eq!(info.description, "Shirt");
        assert_eq!(info.price_in_cents, MoneyInCents::from_cents(750));
        assert_eq!(info.category_id, TOYS);
        assert_eq!(info.sale_count, 0);
        assert!(!info.has_been_sold);
        assert!(!info.hidden);

        db.sales().add_sale(CASHIER, Timestamp::from_secs(1), &[item_id]).await.unwrap();
        db.sales().add_sale(CASHIER, Timestamp::from_secs(2), &[item_id]).await.unwrap();
        let info = db.items().sale_info(item_id).await.unwrap();
        assert_eq!(info.sale_count, 2);
        assert!(info.has_been_sold);

        assert_domain(db.items().sale_info(999).await.unwrap_err(), "no_such_item");
    }

    #[tokio::test]
    async fn test_seller_counts_and_totals() {
        let db = event_db().await;
        let items = db.items();

        let summary = items.seller_summary(SELLER).await.unwrap();
        assert_eq!(
            summary,
            SellerSummary {
                item_count: 0,
                frozen_item_count: 0,
                hidden_item_count: 0,
                total_price_in_cents: MoneyInCents::zero(),
            }
        );

        let frozen = items.create(&new_item(SELLER, 100)).await.unwrap();
        let hidden = items.create(&new_item(SELLER, 200)).await.unwrap();
        items.create(&new_item(SELLER, 400)).await.unwrap();
        items.create(&new_item(OTHER_SELLER, 800)).await.unwrap();
        items.set_frozen(&[frozen], true).await.unwrap();
        items.set_hidden(&[hidden], true).await.unwrap();

        assert_eq!(items.seller_item_count(SELLER, ItemSelection::All).await.unwrap(), 3);
        assert_eq!(items.seller_item_count(SELLER, ItemSelection::Hidden).await.unwrap(), 1);
        assert_eq!(
            items.seller_total_price(SELLER, ItemSelection::All).await.unwrap(),
            MoneyInCents::from_cents(700)
        );
        assert_eq!(
            items.seller_total_price(OTHER_SELLER, ItemSelection::Hidden).await.unwrap(),
            MoneyInCents::zero()
        );

        let summary = items.seller_summary(SELLER).await.unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.frozen_item_count, 1);
        assert_eq!(summary.hidden_item_count, 1);
        assert_eq!(summary.total_price_in_cents, MoneyInCents::from_cents(500));

        assert_domain(items.seller_summary(CASHIER).await.unwrap_err(), "wrong_role");
        assert_domain(
            items.seller_item_count(999, ItemSelection::All).await.unwrap_err(),
            "no_such_user",
        );
    }
}
