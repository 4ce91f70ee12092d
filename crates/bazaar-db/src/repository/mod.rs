//! # Repository Module
//!
//! Store operations of the event database, one repository per aggregate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who writes which rows                                │
//! │                                                                         │
//! │  Request handler                                                       │
//! │       │                                                                 │
//! │       │  db.items().set_frozen(&ids, true)                             │
//! │       ▼                                                                 │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐  │
//! │  │ UserRepo     │ │ CategoryRepo │ │ ItemRepo     │ │ SaleRepo     │  │
//! │  │ users        │ │ item_        │ │ items        │ │ sales        │  │
//! │  │              │ │ categories   │ │ (lifecycle   │ │ sale_items   │  │
//! │  │              │ │              │ │  guard)      │ │ (atomic)     │  │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └──────────────┘  │
//! │                         ┌──────────────┐                               │
//! │                         │ SessionRepo  │  sessions                     │
//! │                         └──────────────┘                               │
//! │                                                                         │
//! │  Rule: items and sales are never written outside their repository.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Existence and role checks are done by the repositories themselves so that
//! callers receive typed [`CoreError`](bazaar_core::CoreError)s rather than
//! SQLite constraint messages. Helpers shared across repositories take a
//! `&mut SqliteConnection` so they can run inside a caller's transaction.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Users, roles, credentials
//! - [`CategoryRepository`](category::CategoryRepository) - Item categories
//! - [`ItemRepository`](item::ItemRepository) - Item lifecycle guard
//! - [`SaleRepository`](sale::SaleRepository) - Sale transaction manager
//! - [`SessionRepository`](session::SessionRepository) - Login sessions

use bazaar_core::ItemSelection;

pub mod category;
pub mod item;
pub mod sale;
pub mod session;
pub mod user;

/// Item columns in the shape of [`bazaar_core::Item`], for a source aliased `i`.
pub(crate) const ITEM_COLUMNS: &str = "i.item_id, i.added_at, i.description, i.price_in_cents, \
     i.item_category_id AS category_id, i.seller_id, i.donation, i.charity, i.frozen, i.hidden";

/// Table or view holding the items of a selection.
pub(crate) fn item_source(selection: ItemSelection) -> &'static str {
    match selection {
        ItemSelection::All => "items",
        ItemSelection::Visible => "visible_items",
        ItemSelection::Hidden => "hidden_items",
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use bazaar_core::{Id, MoneyInCents, NewItem, Role, Timestamp};

    use crate::{Database, DbConfig};

    pub const ADMIN: Id = 1;
    pub const SELLER: Id = 2;
    pub const OTHER_SELLER: Id = 3;
    pub const CASHIER: Id = 4;
    pub const OTHER_CASHIER: Id = 5;
    pub const TOYS: Id = 11;
    pub const PASSWORD: &str = "pw";

    /// In-memory database with one admin, two sellers, two cashiers and
    /// the default categories.
    pub async fn event_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = db.users();
        for (id, role) in [
            (ADMIN, Role::Admin),
            (SELLER, Role::Seller),
            (OTHER_SELLER, Role::Seller),
            (CASHIER, Role::Cashier),
            (OTHER_CASHIER, Role::Cashier),
        ] {
            users
                .add_with_id(id, role, Timestamp::from_secs(0), PASSWORD)
                .await
                .unwrap();
        }
        db.categories().add_defaults().await.unwrap();
        db
    }

    pub fn new_item(seller_id: Id, price: i64) -> NewItem {
        NewItem {
            added_at: Timestamp::from_secs(0),
            description: "Shirt".to_string(),
            price_in_cents: MoneyInCents::from_cents(price),
            category_id: TOYS,
            seller_id,
            donation: false,
            charity: false,
        }
    }

    pub async fn add_item(db: &Database, seller_id: Id) -> Id {
        db.items().create(&new_item(seller_id, 1000)).await.unwrap()
    }
}
