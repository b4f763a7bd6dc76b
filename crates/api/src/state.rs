use std::sync::Arc;

use tokio::sync::Notify;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: rollout_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Wakes the outbox dispatcher after a mutation commits new messages.
    pub outbox_signal: Arc<Notify>,
}
