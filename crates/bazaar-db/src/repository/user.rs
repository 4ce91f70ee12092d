//! # User Repository
//!
//! Users, their roles and their credentials.
//!
//! ## Identity Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_role(conn, user_id, Seller)                                     │
//! │       │                                                                 │
//! │       ├── no row              → NoSuchUser(user_id)                    │
//! │       ├── role != Seller      → WrongRole { expected, actual }         │
//! │       └── OK                  → User                                   │
//! │                                                                         │
//! │  authenticate(user_id, password)                                        │
//! │       │                                                                 │
//! │       ├── no row              → NoSuchUser(user_id)                    │
//! │       ├── hash mismatch       → WrongPassword                          │
//! │       └── OK                  → Role                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::validation::validate_password;
use bazaar_core::{CoreError, Id, ItemSelection, Role, Timestamp, User, UserWithItemCount};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::password::{hash_password, verify_password};
use crate::repository::item_source;
use crate::transaction::finish;

const USER_COLUMNS: &str = "u.user_id, u.role_id AS role, u.created_at, u.last_activity";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user with an explicit id.
    ///
    /// Fails with `UserIdAlreadyInUse` if the id is taken.
    pub async fn add_with_id(
        &self,
        user_id: Id,
        role: Role,
        created_at: Timestamp,
        password: &str,
    ) -> DbResult<()> {
        // Hashing is slow; keep it outside the write transaction
        let hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        let result = insert_user(&mut tx, user_id, role, created_at, &hash).await;
        finish(tx, result).await?;

        info!(user_id, %role, "User created");
        Ok(())
    }

    /// Creates a user with a store-assigned id and returns that id.
    pub async fn add(&self, role: Role, created_at: Timestamp, password: &str) -> DbResult<Id> {
        let hash = hash_password(password)?;
        let result = sqlx::query(
            "INSERT INTO users (role_id, created_at, last_activity, password_hash) \
             VALUES (?1, ?2, NULL, ?3)",
        )
        .bind(role)
        .bind(created_at)
        .bind(hash)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        info!(user_id, %role, "User created");
        Ok(user_id)
    }

    /// Gets a user by id.
    pub async fn get(&self, user_id: Id) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, user_id)
            .await?
            .ok_or_else(|| CoreError::NoSuchUser(user_id).into())
    }

    /// Whether a user with this id exists.
    pub async fn exists(&self, user_id: Id) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_user(&mut conn, user_id).await?.is_some())
    }

    /// Gets a user and checks their role.
    pub async fn ensure_role(&self, user_id: Id, role: Role) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        ensure_role(&mut conn, user_id, role).await
    }

    /// Lists all users ordered by id.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.user_id");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Lists all users with the number of items of `selection` they consigned.
    pub async fn list_with_item_count(
        &self,
        selection: ItemSelection,
    ) -> DbResult<Vec<UserWithItemCount>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, COUNT(i.item_id) AS item_count \
             FROM users u \
             LEFT JOIN {} i ON i.seller_id = u.user_id \
             GROUP BY u.user_id \
             ORDER BY u.user_id",
            item_source(selection)
        );
        let users = sqlx::query_as::<_, UserWithItemCount>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Records the time of the user's latest authenticated request.
    pub async fn update_last_activity(&self, user_id: Id, at: Timestamp) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET last_activity = ?1 WHERE user_id = ?2")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NoSuchUser(user_id).into());
        }
        Ok(())
    }

    /// Replaces a user's password. Existing sessions stay valid.
    pub async fn update_password(&self, user_id: Id, password: &str) -> DbResult<()> {
        validate_password(password)?;
        let hash = hash_password(password)?;
        let result = sqlx::query("UPDATE users SET password_hash = ?1 WHERE user_id = ?2")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NoSuchUser(user_id).into());
        }
        info!(user_id, "Password changed");
        Ok(())
    }

    /// Removes a user and their sessions.
    ///
    /// ## Errors
    /// - `NoSuchUser` if absent
    /// - `UserOwnsItems` if any item names them as seller
    /// - `UserHasSales` if they recorded any sale
    pub async fn remove(&self, user_id: Id) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = remove_user(&mut tx, user_id).await;
        finish(tx, result).await?;

        info!(user_id, "User removed");
        Ok(())
    }

    /// Checks a password and returns the user's role.
    pub async fn authenticate(&self, user_id: Id, password: &str) -> DbResult<Role> {
        let row: Option<(Role, String)> =
            sqlx::query_as("SELECT role_id, password_hash FROM users WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let (role, hash) = row.ok_or(CoreError::NoSuchUser(user_id))?;
        if !verify_password(password, &hash) {
            debug!(user_id, "Password mismatch");
            return Err(CoreError::WrongPassword.into());
        }
        Ok(role)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_user(conn: &mut SqliteConnection, user_id: Id) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub(crate) async fn ensure_role(
    conn: &mut SqliteConnection,
    user_id: Id,
    role: Role,
) -> DbResult<User> {
    let user = fetch_user(conn, user_id)
        .await?
        .ok_or(CoreError::NoSuchUser(user_id))?;

    if user.role != role {
        return Err(CoreError::WrongRole {
            user_id,
            expected: role,
            actual: user.role,
        }
        .into());
    }
    Ok(user)
}

async fn insert_user(
    conn: &mut SqliteConnection,
    user_id: Id,
    role: Role,
    created_at: Timestamp,
    password_hash: &str,
) -> DbResult<()> {
    if fetch_user(conn, user_id).await?.is_some() {
        return Err(CoreError::UserIdAlreadyInUse(user_id).into());
    }

    sqlx::query(
        "INSERT INTO users (user_id, role_id, created_at, last_activity, password_hash) \
         VALUES (?1, ?2, ?3, NULL, ?4)",
    )
    .bind(user_id)
    .bind(role)
    .bind(created_at)
    .bind(password_hash)
    .execute(conn)
    .await
    .map_err(|e| match DbError::from(e) {
        // Lost a race with another writer between the check and the insert
        DbError::UniqueViolation { .. } => CoreError::UserIdAlreadyInUse(user_id).into(),
        other => other,
    })?;
    Ok(())
}

async fn remove_user(conn: &mut SqliteConnection, user_id: Id) -> DbResult<()> {
    if fetch_user(conn, user_id).await?.is_none() {
        return Err(CoreError::NoSuchUser(user_id).into());
    }

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE seller_id = ?1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if items > 0 {
        return Err(CoreError::UserOwnsItems(user_id).into());
    }

    let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE cashier_id = ?1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if sales > 0 {
        return Err(CoreError::UserHasSales(user_id).into());
    }

    sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM users WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() != 1 {
        return Err(DbError::Internal(format!(
            "Deleting user {} affected {} rows",
            user_id,
            result.rows_affected()
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
