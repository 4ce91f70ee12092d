//! # Validation Module
//!
//! Per-field rules shared by the item guard, the sale manager and the
//! request dispatcher.
//!
//! ## Where Checks Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dispatcher (bazaar-server)                                   │
//! │  ├── Deserialization, id parsing                                       │
//! │  └── parse_id, Role / ItemSelection parsing                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Store operations (bazaar-db)                                 │
//! │  ├── THIS MODULE: price, description, category name, sale item list    │
//! │  └── Runs before any row is read or written                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (price_in_cents > 0), CHECK (NOT (frozen AND hidden))       │
//! │  ├── UNIQUE category names                                             │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_price, validate_sale_items};
//! use bazaar_core::MoneyInCents;
//!
//! assert!(validate_price(MoneyInCents::from_cents(250)).is_ok());
//! assert!(validate_sale_items(&[1, 2, 3]).is_ok());
//! assert!(validate_sale_items(&[1, 2, 1]).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::MoneyInCents;
use crate::types::{Id, NewItem};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Item Fields
// =============================================================================

/// Validates an item price.
///
/// ## Rules
/// - Must be strictly positive (donated items carry a price too)
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_price;
/// use bazaar_core::MoneyInCents;
///
/// assert!(validate_price(MoneyInCents::from_cents(1)).is_ok());
/// assert!(validate_price(MoneyInCents::from_cents(0)).is_err());
/// ```
pub fn validate_price(price: MoneyInCents) -> ValidationResult<()> {
    if !price.is_valid_price() {
        return Err(ValidationError::InvalidPrice(price.cents()));
    }
    Ok(())
}

/// Validates an item description.
///
/// ## Rules
/// - Must contain at least one non-whitespace character
pub fn validate_item_description(description: &str) -> ValidationResult<()> {
    if description.trim().is_empty() {
        return Err(ValidationError::InvalidItemDescription);
    }
    Ok(())
}

/// Validates the field-level rules of a new item, price first.
///
/// Existence of the seller and the category is checked by the store.
pub fn validate_new_item(item: &NewItem) -> ValidationResult<()> {
    validate_price(item.price_in_cents)?;
    validate_item_description(&item.description)
}

// =============================================================================
// Categories
// =============================================================================

/// Validates a category name.
///
/// ## Rules
/// - Must contain at least one non-whitespace character
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidCategoryName);
    }
    Ok(())
}

// =============================================================================
// Users
// =============================================================================

/// Validates a new password: anything but the empty string.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Sales
// =============================================================================

/// Returns the first item id that appears more than once, if any.
pub fn find_duplicate(ids: &[Id]) -> Option<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().find(|id| !seen.insert(*id))
}

/// Validates the item list of a sale request.
///
/// ## Rules
/// ```text
///   ids empty?            → SaleMissingItems
///   any id twice?         → DuplicateItemInSale(first repeated id)
///   otherwise             → OK, store checks existence and visibility
/// ```
pub fn validate_sale_items(ids: &[Id]) -> ValidationResult<()> {
    if ids.is_empty() {
        return Err(ValidationError::SaleMissingItems);
    }
    if let Some(id) = find_duplicate(ids) {
        return Err(ValidationError::DuplicateItemInSale(id));
    }
    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Parses a decimal id from a path or form field.
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::parse_id;
///
/// assert_eq!(parse_id("item id", "42").unwrap(), 42);
/// assert!(parse_id("item id", "forty-two").is_err());
/// ```
pub fn parse_id(field: &str, raw: &str) -> ValidationResult<Id> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    raw.parse::<Id>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not an integer", raw),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
