//! # Transaction Completion
//!
//! Every multi-statement mutation (sale creation and removal, bulk
//! freeze/hide, user removal) runs its statements against one
//! transaction and hands the outcome to [`finish`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = pool.begin().await?;                                     │
//! │  let result = write_rows(&mut tx, ...).await;                          │
//! │  finish(tx, result).await                                              │
//! │       │                                                                 │
//! │       ├── Ok(v)   ──► COMMIT ──► Ok(v)                                 │
//! │       │                                                                 │
//! │       └── Err(e)  ──► ROLLBACK ──┬── ok ──► Err(e)  (unchanged)        │
//! │                                  └── failed ──► log + exit(1)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rollback that fails leaves the store in an unknown state, so the
//! process terminates instead of serving further requests from it.

use sqlx::{Sqlite, Transaction};
use tracing::error;

use crate::error::{DbError, DbResult};

/// Commits on success, rolls back on failure and returns the original error.
pub(crate) async fn finish<T>(tx: Transaction<'_, Sqlite>, result: DbResult<T>) -> DbResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            Ok(value)
        }
        Err(err) => {
            rollback_or_abort(tx).await;
            Err(err)
        }
    }
}

/// Rolls back `tx`, terminating the process if the store refuses.
pub(crate) async fn rollback_or_abort(tx: Transaction<'_, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        error!(error = %e, "Transaction rollback failed; store state is indeterminate, exiting");
        std::process::exit(1);
    }
}
