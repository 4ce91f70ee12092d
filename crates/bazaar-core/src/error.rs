//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations (tagged by ErrorKind)   │
//! │  └── ValidationError  - Per-field input failures                       │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  bazaar-server errors                                                  │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Kinds
//! Every [`CoreError`] belongs to exactly one [`ErrorKind`]. Boundary layers
//! translate kinds, never individual variants, into responses:
//!
//! ```text
//! NotFound            no such user / item / category / sale
//! InvalidInput        bad price, empty description, empty sale
//! Conflict            duplicate item in sale, id in use, hidden+frozen
//! Forbidden           role lacks the capability, foreign seller's item
//! PreconditionFailed  item frozen / hidden / sold, user owns items or sales
//! Unauthenticated     wrong password, unknown or expired session
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::types::{Capability, Id, Role};

// =============================================================================
// Error Kind
// =============================================================================

/// Stable, matchable category of a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Forbidden,
    PreconditionFailed,
    Unauthenticated,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::Unauthenticated => "unauthenticated",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
///
/// Every precondition failure of the item guard, the sale manager and the
/// session authenticator is one of these. They are returned unchanged to
/// the caller and no row has been written when one is produced.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No user with this id.
    #[error("No such user: {0}")]
    NoSuchUser(Id),

    /// No item with this id.
    #[error("No such item: {0}")]
    NoSuchItem(Id),

    /// No category with this id.
    #[error("No such category: {0}")]
    NoSuchCategory(Id),

    /// No sale with this id.
    #[error("No such sale: {0}")]
    NoSuchSale(Id),

    /// Session id is unknown or its expiration time has passed.
    ///
    /// ## When This Occurs
    /// - The cookie carries an id that was never issued
    /// - The session was deleted by logout or by the expiry pass
    /// - The session still exists but `expiration_time <= now`
    ///
    /// The three cases are deliberately indistinguishable.
    #[error("No such session")]
    NoSuchSession,

    /// Role id outside the closed admin/seller/cashier set.
    #[error("No such role: {0}")]
    NoSuchRole(i64),

    /// Password does not match the stored hash.
    #[error("Wrong password")]
    WrongPassword,

    /// User exists but has the wrong role for the operation.
    ///
    /// ## When This Occurs
    /// - Creating an item for a user that is not a seller
    /// - Listing cashier sales of a user that is not a cashier
    #[error("User {user_id} has role {actual}, expected {expected}")]
    WrongRole {
        user_id: Id,
        expected: Role,
        actual: Role,
    },

    /// Sale recorded on behalf of a user that is not a cashier.
    #[error("User {0} is not a cashier; sales require a cashier")]
    SaleRequiresCashier(Id),

    /// Caller's role does not hold the capability the operation requires.
    #[error("Role {role} lacks capability {capability}")]
    Forbidden { role: Role, capability: Capability },

    /// Seller tried to act on an item consigned by another seller.
    #[error("Item {item_id} does not belong to seller {seller_id}")]
    NotItemOwner { item_id: Id, seller_id: Id },

    /// Cashier tried to read another cashier's sales.
    #[error("User {caller} cannot access data of user {owner}")]
    NotOwnData { caller: Id, owner: Id },

    /// Explicit user id clashes with an existing user.
    #[error("User id {0} is already in use")]
    UserIdAlreadyInUse(Id),

    /// Explicit category id clashes with an existing category.
    #[error("Category id {0} is already in use")]
    CategoryIdAlreadyInUse(Id),

    /// Request would leave an item both hidden and frozen.
    #[error("Item {0} cannot be hidden and frozen at the same time")]
    HiddenFrozenItem(Id),

    /// Frozen items reject every mutation except unfreezing.
    #[error("Item {0} is frozen")]
    ItemFrozen(Id),

    /// Hidden items cannot be sold.
    #[error("Item {0} is hidden")]
    ItemHidden(Id),

    /// Item is referenced by at least one sale and cannot be removed.
    #[error("Item {0} has been sold and cannot be removed")]
    ItemHasSales(Id),

    /// User still owns items and cannot be removed.
    #[error("User {0} still owns items")]
    UserOwnsItems(Id),

    /// User recorded sales as a cashier and cannot be removed.
    #[error("User {0} has recorded sales")]
    UserHasSales(Id),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error into its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NoSuchUser(_)
            | CoreError::NoSuchItem(_)
            | CoreError::NoSuchCategory(_)
            | CoreError::NoSuchSale(_) => ErrorKind::NotFound,

            CoreError::NoSuchSession | CoreError::WrongPassword => ErrorKind::Unauthenticated,

            CoreError::NoSuchRole(_) => ErrorKind::InvalidInput,

            CoreError::WrongRole { .. }
            | CoreError::SaleRequiresCashier(_)
            | CoreError::Forbidden { .. }
            | CoreError::NotItemOwner { .. }
            | CoreError::NotOwnData { .. } => ErrorKind::Forbidden,

            CoreError::UserIdAlreadyInUse(_)
            | CoreError::CategoryIdAlreadyInUse(_)
            | CoreError::HiddenFrozenItem(_) => ErrorKind::Conflict,

            CoreError::ItemFrozen(_)
            | CoreError::ItemHidden(_)
            | CoreError::ItemHasSales(_)
            | CoreError::UserOwnsItems(_)
            | CoreError::UserHasSales(_) => ErrorKind::PreconditionFailed,

            CoreError::Validation(err) => err.kind(),
        }
    }

    /// Short snake_case tag identifying the variant, for clients that need
    /// more detail than the kind (e.g. `"item_frozen"`).
    pub fn tag(&self) -> &'static str {
        match self {
            CoreError::NoSuchUser(_) => "no_such_user",
            CoreError::NoSuchItem(_) => "no_such_item",
            CoreError::NoSuchCategory(_) => "no_such_category",
            CoreError::NoSuchSale(_) => "no_such_sale",
            CoreError::NoSuchSession => "no_such_session",
            CoreError::NoSuchRole(_) => "no_such_role",
            CoreError::WrongPassword => "wrong_password",
            CoreError::WrongRole { .. } => "wrong_role",
            CoreError::SaleRequiresCashier(_) => "sale_requires_cashier",
            CoreError::Forbidden { .. } => "forbidden",
            CoreError::NotItemOwner { .. } => "wrong_seller",
            CoreError::NotOwnData { .. } => "wrong_user",
            CoreError::UserIdAlreadyInUse(_) => "user_id_already_in_use",
            CoreError::CategoryIdAlreadyInUse(_) => "category_id_already_in_use",
            CoreError::HiddenFrozenItem(_) => "hidden_frozen_item",
            CoreError::ItemFrozen(_) => "item_frozen",
            CoreError::ItemHidden(_) => "item_hidden",
            CoreError::ItemHasSales(_) => "item_has_sales",
            CoreError::UserOwnsItems(_) => "user_owns_items",
            CoreError::UserHasSales(_) => "user_has_sales",
            CoreError::Validation(err) => err.tag(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are detected before any store access and abort the operation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Price must be strictly positive.
    #[error("Invalid price: {0} cents (must be positive)")]
    InvalidPrice(i64),

    /// Item description is empty or whitespace.
    #[error("Item description must not be empty")]
    InvalidItemDescription,

    /// Category name is empty or whitespace.
    #[error("Category name must not be empty")]
    InvalidCategoryName,

    /// Sale without any item.
    #[error("A sale must contain at least one item")]
    SaleMissingItems,

    /// The same item id appears twice in one sale request.
    #[error("Item {0} appears more than once in the sale")]
    DuplicateItemInSale(Id),

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g. unparsable id or role name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Classifies this error into its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::DuplicateItemInSale(_) => ErrorKind::Conflict,
            _ => ErrorKind::InvalidInput,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            ValidationError::InvalidPrice(_) => "invalid_price",
            ValidationError::InvalidItemDescription => "invalid_item_description",
            ValidationError::InvalidCategoryName => "invalid_category_name",
            ValidationError::SaleMissingItems => "sale_missing_items",
            ValidationError::DuplicateItemInSale(_) => "duplicate_item_in_sale",
            ValidationError::Required { .. } => "missing_field",
            ValidationError::InvalidFormat { .. } => "invalid_format",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
