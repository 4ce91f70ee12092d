//! # bazaar-core: Pure Domain Logic for the Bazaar Backend
//!
//! This crate holds the domain of a second-hand sale event: sellers consign
//! priced items into categories, cashiers group items into sales and
//! administrators oversee everything. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  bazaar-server (Dispatcher)                     │   │
//! │  │   session cookie ──► capability check ──► operation ──► notify  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │ Item,Sale │  │MoneyInCts │  │ ErrorKind │  │   rules   │  │   │
//! │  │   │ Role,Caps │  │           │  │ CoreError │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  bazaar-db (Store Layer)                        │   │
//! │  │      item guard, sale transactions, sessions, migrations       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Item, Sale, Session, Role, ...)
//! - [`money`] - Prices in integer cents
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Per-field rules shared by the guard and the sale manager
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::{Capability, Role};
//!
//! assert!(Capability::RecordSales.permits(Role::Cashier));
//! assert!(!Capability::RecordSales.permits(Role::Seller));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::MoneyInCents;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Payload posted to the live-update channel after every committed mutation.
///
/// Clients treat it as an opaque "something changed" signal and re-fetch.
pub const UPDATE_MESSAGE: &str = "update";

/// Default lifetime of a login session (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Categories created when a fresh event database is seeded.
pub const DEFAULT_CATEGORIES: &[(Id, &str)] = &[
    (1, "Clothing 0-3 mos (50-56)"),
    (2, "Clothing 3-6 mos (56-62)"),
    (3, "Clothing 6-12 mos (68-80)"),
    (4, "Clothing 12-24 mos (86-92)"),
    (5, "Clothing 2-3 yrs (92-98)"),
    (6, "Clothing 4-6 yrs (104-116)"),
    (7, "Clothing 7-8 yrs (122-128)"),
    (8, "Clothing 9-10 yrs (128-140)"),
    (9, "Clothing 11-12 yrs (140-152)"),
    (10, "Shoes (infant to 12 yrs)"),
    (11, "Toys"),
    (12, "Baby/Child Equipment"),
];
