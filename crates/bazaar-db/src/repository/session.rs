//! # Session Repository (Session Store / Authenticator)
//!
//! Login sessions and their expiry.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(user, password, ttl)                                             │
//! │    └── authenticate ──► INSERT sessions (random id, now + ttl)         │
//! │                                                                         │
//! │  resolve(session_id, now)                                               │
//! │    ├── absent            ─┐                                             │
//! │    ├── expiration <= now ─┴──► NoSuchSession (indistinguishable)       │
//! │    └── OK ──► Identity { user_id, role }                               │
//! │               └── UPDATE users.last_activity (best effort)             │
//! │                                                                         │
//! │  logout(session_id)        DELETE, idempotent                          │
//! │  expire(cutoff)            DELETE WHERE expiration_time <= cutoff      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{CoreError, Id, Identity, Role, Session, SessionId, Timestamp};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::user::{fetch_user, UserRepository};

/// Repository for session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Checks the credentials and opens a session lasting `ttl_secs`.
    ///
    /// Returns the new session id and the user's role.
    pub async fn login(
        &self,
        user_id: Id,
        password: &str,
        ttl_secs: i64,
    ) -> DbResult<(SessionId, Role)> {
        let role = UserRepository::new(self.pool.clone())
            .authenticate(user_id, password)
            .await?;
        let expiration = Timestamp::now().plus_secs(ttl_secs);
        let session_id = self.add_session(user_id, expiration).await?;

        info!(user_id, %role, "User logged in");
        Ok((session_id, role))
    }

    /// Opens a session for `user_id` expiring at `expiration`.
    pub async fn add_session(&self, user_id: Id, expiration: Timestamp) -> DbResult<SessionId> {
        let mut conn = self.pool.acquire().await?;
        if fetch_user(&mut conn, user_id).await?.is_none() {
            return Err(CoreError::NoSuchUser(user_id).into());
        }

        let session_id = generate_session_id();
        sqlx::query(
            "INSERT INTO sessions (session_id, user_id, expiration_time) VALUES (?1, ?2, ?3)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(expiration)
        .execute(&mut *conn)
        .await?;

        debug!(user_id, %expiration, "Session created");
        Ok(session_id)
    }

    /// Resolves a live session to the identity behind it.
    ///
    /// Unknown and expired ids both yield `NoSuchSession`. On success the
    /// owner's `last_activity` is set to `now`; a failure to do so is logged
    /// and swallowed, this being the one place a store error is discarded.
    pub async fn resolve(&self, session_id: &str, now: Timestamp) -> DbResult<Identity> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT u.user_id, u.role_id AS role \
             FROM sessions s \
             INNER JOIN users u ON u.user_id = s.user_id \
             WHERE s.session_id = ?1 AND ?2 < s.expiration_time",
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CoreError::NoSuchSession)?;

        if let Err(e) = UserRepository::new(self.pool.clone())
            .update_last_activity(identity.user_id, now)
            .await
        {
            warn!(user_id = identity.user_id, error = %e, "Failed to record last activity");
        }

        Ok(identity)
    }

    /// Gets a session regardless of its expiration.
    pub async fn get(&self, session_id: &str) -> DbResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT session_id, user_id, expiration_time FROM sessions WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or_else(|| CoreError::NoSuchSession.into())
    }

    /// Lists all stored sessions, expired ones included.
    pub async fn list(&self) -> DbResult<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT session_id, user_id, expiration_time FROM sessions \
             ORDER BY expiration_time, session_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Deletes a session. Returns whether it existed.
    pub async fn logout(&self, session_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        let existed = result.rows_affected() > 0;
        debug!(existed, "Session deleted");
        Ok(existed)
    }

    /// Deletes every session with `expiration_time <= cutoff`.
    ///
    /// Returns the number of deleted sessions.
    pub async fn expire(&self, cutoff: Timestamp) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiration_time <= ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_session_id() -> SessionId {
    Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
