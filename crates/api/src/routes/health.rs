use axum::extract::State;
use axum::{routing::get, Json, Router};
use rollout_db::repositories::OutboxRepo;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Outbox messages not yet delivered or dead-lettered. Absent when the
    /// database is down.
    pub outbox_pending: Option<i64>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let outbox_pending = match rollout_db::health_check(&state.pool).await {
        Ok(()) => OutboxRepo::count_pending(&state.pool).await.ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            None
        }
    };
    let db_healthy = outbox_pending.is_some();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        outbox_pending,
    })
}

/// Routes mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
