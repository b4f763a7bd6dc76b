//! Sync outbox row model.

use rollout_core::outbox::OutboxMessage;
use rollout_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sync_outbox` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutboxEntry {
    pub id: DbId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub next_attempt_at: Timestamp,
    pub locked_until: Option<Timestamp>,
    pub last_error: Option<String>,
    pub delivered_at: Option<Timestamp>,
    pub dead_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl OutboxEntry {
    /// Decode the stored payload.
    pub fn message(&self) -> Result<OutboxMessage, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
