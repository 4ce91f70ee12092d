//! Periodic removal of expired sessions.

use std::time::Duration;

use bazaar_core::Timestamp;
use bazaar_db::{Database, DbResult};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Deletes every session expired at `now`. Returns how many were removed.
pub async fn expire_once(db: &Database, now: Timestamp) -> DbResult<u64> {
    let removed = db.sessions().expire(now).await?;
    if removed > 0 {
        info!(removed, "Expired sessions removed");
    } else {
        debug!("No expired sessions");
    }
    Ok(removed)
}

/// Runs [`expire_once`] every `period` until the task is aborted.
pub fn spawn_session_expiry(db: Database, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = expire_once(&db, Timestamp::now()).await {
                warn!(error = %e, "Session expiry pass failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Role;
    use bazaar_db::DbConfig;

    #[tokio::test]
    async fn test_expire_once_removes_only_expired() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users()
            .add_with_id(2, Role::Seller, Timestamp::from_secs(0), "pw")
            .await
            .unwrap();

        let sessions = db.sessions();
        sessions.add_session(2, Timestamp::from_secs(100)).await.unwrap();
        let live = sessions.add_session(2, Timestamp::from_secs(500)).await.unwrap();

        assert_eq!(expire_once(&db, Timestamp::from_secs(100)).await.unwrap(), 1);
        assert_eq!(expire_once(&db, Timestamp::from_secs(100)).await.unwrap(), 0);

        let remaining = sessions.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].session_id, live);
    }

    #[tokio::test]
    async fn test_background_task_runs_and_aborts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users()
            .add_with_id(2, Role::Seller, Timestamp::from_secs(0), "pw")
            .await
            .unwrap();
        db.sessions()
            .add_session(2, Timestamp::from_secs(1))
            .await
            .unwrap();

        let task = spawn_session_expiry(db.clone(), Duration::from_secs(60));
        // First tick fires immediately
        for _ in 0..50 {
            if db.sessions().list().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(db.sessions().list().await.unwrap().is_empty());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
