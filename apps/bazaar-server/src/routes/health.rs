//! Liveness check for load balancers and operators.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// Newest applied migration, `None` while the database is unreachable.
    pub schema_version: Option<i64>,
    pub subscribers: Option<usize>,
}

/// `GET /health`: 200 while the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let schema_version = state.db.schema_version().await.ok().flatten();
    let subscribers = state.broadcaster.subscriber_count().await.ok();

    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            schema_version,
            subscribers,
        }),
    )
}
