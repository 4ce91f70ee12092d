//! # Domain Types
//!
//! Core domain types of the sale event.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │      Item       │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user_id        │◄──│  seller_id      │   │  sale_id        │       │
//! │  │  role           │   │  category_id ───┼─► │  cashier_id ────┼─► User│
//! │  │  created_at     │   │  price_in_cents │   │  transaction_   │       │
//! │  │  last_activity  │   │  frozen, hidden │   │      time       │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │   sale_items (join)  │                │
//! │                                 └──────────────────────┘                │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │    Session      │   │   Role          │       │
//! │  │  category_id    │   │  session_id     │   │  Admin   (1)    │       │
//! │  │  name (unique)  │   │  user_id        │   │  Seller  (2)    │       │
//! │  └─────────────────┘   │  expiration     │   │  Cashier (3)    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Item State
//! An item is at most one of `frozen` (label printed, no more edits) and
//! `hidden` (withdrawn from listings and sales). Never both.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::MoneyInCents;

/// Identifier of users, categories, items and sales.
pub type Id = i64;

/// Opaque session identifier (32 lowercase hex characters).
pub type SessionId = String;

// =============================================================================
// Timestamp
// =============================================================================

/// Point in time as whole seconds since the Unix epoch.
///
/// Stored as an INTEGER column so that SQL comparisons (`expiration_time <= ?`)
/// and orderings are numeric.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp())
    }

    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs)
    }

    #[inline]
    pub const fn secs(&self) -> i64 {
        self.0
    }

    /// Returns this timestamp shifted by `secs` seconds (may be negative),
    /// clamped to the representable range.
    #[inline]
    pub const fn plus_secs(&self, secs: i64) -> Self {
        Timestamp(self.0.saturating_add(secs))
    }

    /// Converts to a chrono UTC datetime, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Role of a user. Closed set, fixed at user creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
#[repr(i64)]
pub enum Role {
    Admin = 1,
    Seller = 2,
    Cashier = 3,
}

impl Role {
    /// All roles, in id order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Seller, Role::Cashier];

    /// Numeric id as stored in `users.role_id`.
    #[inline]
    pub const fn id(&self) -> i64 {
        *self as i64
    }

    /// Looks up a role by its numeric id.
    pub fn from_id(id: i64) -> Result<Self, CoreError> {
        Role::ALL
            .into_iter()
            .find(|role| role.id() == id)
            .ok_or(CoreError::NoSuchRole(id))
    }

    /// Lowercase name (`"admin"`, `"seller"`, `"cashier"`).
    pub const fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("unknown role '{}'", s),
            })
    }
}

// =============================================================================
// Capability
// =============================================================================

/// What an operation requires from the caller's role.
///
/// Role checks are an explicit comparison against this closed set rather
/// than an inspection of error values.
///
/// ```text
///                 Admin   Seller   Cashier
/// Administer        ✓
/// ManageItems       ✓       ✓
/// RecordSales                        ✓
/// LookUpItems       ✓                ✓
/// Browse            ✓       ✓        ✓
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Event-wide oversight: users, all items, all sales.
    Administer,
    /// Create and edit consigned items (sellers: their own only).
    ManageItems,
    /// Record sales at the checkout.
    RecordSales,
    /// Look up any single item (checkout scanning).
    LookUpItems,
    /// Read shared reference data such as categories.
    Browse,
}

impl Capability {
    /// Whether `role` holds this capability.
    pub const fn permits(&self, role: Role) -> bool {
        match self {
            Capability::Administer => matches!(role, Role::Admin),
            Capability::ManageItems => matches!(role, Role::Admin | Role::Seller),
            Capability::RecordSales => matches!(role, Role::Cashier),
            Capability::LookUpItems => matches!(role, Role::Admin | Role::Cashier),
            Capability::Browse => true,
        }
    }

    /// Returns `Forbidden` unless `role` holds this capability.
    pub fn require(&self, role: Role) -> Result<(), CoreError> {
        if self.permits(role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                role,
                capability: *self,
            })
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Administer => "administer",
            Capability::ManageItems => "manage_items",
            Capability::RecordSales => "record_sales",
            Capability::LookUpItems => "look_up_items",
            Capability::Browse => "browse",
        };
        f.write_str(name)
    }
}

// =============================================================================
// User
// =============================================================================

/// A participant of the event. The password hash is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub user_id: Id,
    pub role: Role,
    pub created_at: Timestamp,
    /// Updated on every authenticated request (best effort).
    pub last_activity: Option<Timestamp>,
}

/// A user together with the number of items they consigned.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserWithItemCount {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub user: User,
    pub item_count: i64,
}

// =============================================================================
// Category
// =============================================================================

/// An item category. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub category_id: Id,
    pub name: String,
}

/// Number of items in a category (zero included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryCount {
    pub category_id: Id,
    pub name: String,
    pub count: i64,
}

/// Sales revenue of a category: every sold item counted once per sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategorySaleTotal {
    pub category_id: Id,
    pub name: String,
    pub sold_count: i64,
    pub total_in_cents: MoneyInCents,
}

// =============================================================================
// Item
// =============================================================================

/// A consigned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    pub item_id: Id,
    pub added_at: Timestamp,
    pub description: String,
    pub price_in_cents: MoneyInCents,
    pub category_id: Id,
    pub seller_id: Id,
    /// Seller donates the item; proceeds go to the organisers.
    pub donation: bool,
    /// Unsold item goes to charity after the event.
    pub charity: bool,
    /// Label printed; no further edits.
    pub frozen: bool,
    /// Withdrawn from listings and sales.
    pub hidden: bool,
}

impl Item {
    /// Whether the item is currently sellable at the checkout.
    pub fn is_sellable(&self) -> bool {
        !self.hidden
    }
}

/// An item plus the number of sales it appears in.
#[derive(Debug, Clone, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemWithSaleCount {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: Item,
    pub sale_count: i64,
}

/// What the checkout needs to know about a scanned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItemInfo {
    pub item_id: Id,
    pub seller_id: Id,
    pub description: String,
    pub price_in_cents: MoneyInCents,
    pub category_id: Id,
    pub hidden: bool,
    pub sale_count: i64,
    /// Already in some sale; a second sale is allowed but suspicious.
    pub has_been_sold: bool,
}

/// Item figures of one seller. Hidden items count only in
/// `hidden_item_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellerSummary {
    pub item_count: i64,
    pub frozen_item_count: i64,
    pub hidden_item_count: i64,
    pub total_price_in_cents: MoneyInCents,
}

/// Data for a new item. Items start unfrozen and unhidden.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewItem {
    pub added_at: Timestamp,
    pub description: String,
    pub price_in_cents: MoneyInCents,
    pub category_id: Id,
    pub seller_id: Id,
    #[serde(default)]
    pub donation: bool,
    #[serde(default)]
    pub charity: bool,
}

/// Partial update of an item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemUpdate {
    pub added_at: Option<Timestamp>,
    pub description: Option<String>,
    pub price_in_cents: Option<MoneyInCents>,
    pub category_id: Option<Id>,
    pub donation: Option<bool>,
    pub charity: Option<bool>,
}

impl ItemUpdate {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.added_at.is_none()
            && self.description.is_none()
            && self.price_in_cents.is_none()
            && self.category_id.is_none()
            && self.donation.is_none()
            && self.charity.is_none()
    }
}

/// Which partition of the item set a read covers.
///
/// `Visible` and `Hidden` are disjoint and together make up `All`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ItemSelection {
    #[default]
    All,
    Visible,
    Hidden,
}

impl ItemSelection {
    /// Whether an item with the given hidden flag belongs to this selection.
    pub const fn includes(&self, hidden: bool) -> bool {
        match self {
            ItemSelection::All => true,
            ItemSelection::Visible => !hidden,
            ItemSelection::Hidden => hidden,
        }
    }
}

impl FromStr for ItemSelection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ItemSelection::All),
            "visible" => Ok(ItemSelection::Visible),
            "hidden" => Ok(ItemSelection::Hidden),
            other => Err(ValidationError::InvalidFormat {
                field: "selection".to_string(),
                reason: format!("expected all, visible or hidden, got '{}'", other),
            }),
        }
    }
}

/// Optional restrictions for item listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilter {
    pub seller_id: Option<Id>,
    pub category_id: Option<Id>,
}

// =============================================================================
// Sale
// =============================================================================

/// A checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub sale_id: Id,
    pub cashier_id: Id,
    pub transaction_time: Timestamp,
}

/// Sale header with aggregate figures, for overviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleSummary {
    pub sale_id: Id,
    pub cashier_id: Id,
    pub transaction_time: Timestamp,
    pub item_count: i64,
    pub total_price_in_cents: MoneyInCents,
}

/// An item that appears in more than one sale, with those sales.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MultiplySoldItem {
    pub item: Item,
    pub sales: Vec<Sale>,
}

// =============================================================================
// Session
// =============================================================================

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: Id,
    pub expiration_time: Timestamp,
}

impl Session {
    /// A session is usable strictly before its expiration time.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_time <= now
    }
}

/// Who is behind a resolved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Id,
    pub role: Role,
}

impl Identity {
    /// Returns `Forbidden` unless this identity's role holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), CoreError> {
        capability.require(self.role)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
