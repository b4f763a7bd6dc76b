//! Repository for the `sync_outbox` table.
//!
//! Producers enqueue inside their own transaction. The dispatcher claims
//! due rows with `FOR UPDATE SKIP LOCKED` and a lease, so several dispatcher
//! instances never deliver the same row at once.

use std::time::Duration;

use rollout_core::outbox::OutboxMessage;
use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::outbox::OutboxEntry;

const COLUMNS: &str = "id, kind, payload, attempts, next_attempt_at, locked_until, \
    last_error, delivered_at, dead_at, created_at";

pub struct OutboxRepo;

impl OutboxRepo {
    /// Queue a message. Runs in the caller's transaction.
    pub async fn enqueue(
        conn: &mut PgConnection,
        message: &OutboxMessage,
    ) -> Result<DbId, sqlx::Error> {
        let payload =
            serde_json::to_value(message).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query_scalar("INSERT INTO sync_outbox (kind, payload) VALUES ($1, $2) RETURNING id")
            .bind(message.kind())
            .bind(payload)
            .fetch_one(conn)
            .await
    }

    /// Claim up to `limit` due messages, oldest first, and lease them for
    /// `lease`. Rows leased by another dispatcher are skipped until the
    /// lease expires.
    pub async fn claim_due(
        pool: &PgPool,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<OutboxEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE sync_outbox
             SET locked_until = NOW() + make_interval(secs => $2)
             WHERE id IN (
                 SELECT id FROM sync_outbox
                 WHERE delivered_at IS NULL
                   AND dead_at IS NULL
                   AND next_attempt_at <= NOW()
                   AND (locked_until IS NULL OR locked_until < NOW())
                 ORDER BY next_attempt_at ASC, id ASC
                 LIMIT $1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        let mut entries = sqlx::query_as::<_, OutboxEntry>(&query)
            .bind(limit)
            .bind(lease.as_secs_f64())
            .fetch_all(pool)
            .await?;
        // UPDATE .. RETURNING does not preserve the subquery order.
        entries.sort_by_key(|e| (e.next_attempt_at, e.id));
        Ok(entries)
    }

    pub async fn mark_delivered(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_outbox
             SET delivered_at = NOW(), attempts = attempts + 1, locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt and schedule the next one after `retry_in`.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error: &str,
        retry_in: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_outbox
             SET attempts = attempts + 1,
                 last_error = $2,
                 next_attempt_at = NOW() + make_interval(secs => $3),
                 locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(retry_in.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Give up on a message. It stays in the table for inspection.
    pub async fn mark_dead(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_outbox
             SET attempts = attempts + 1, last_error = $2, dead_at = NOW(), locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OutboxEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sync_outbox WHERE id = $1");
        sqlx::query_as::<_, OutboxEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Messages not yet delivered or dead-lettered, oldest first.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<OutboxEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_outbox
             WHERE delivered_at IS NULL AND dead_at IS NULL
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, OutboxEntry>(&query).fetch_all(pool).await
    }

    /// Number of messages still waiting for delivery.
    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM sync_outbox WHERE delivered_at IS NULL AND dead_at IS NULL",
        )
        .fetch_one(pool)
        .await
    }

    /// Every message ever queued, oldest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<OutboxEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sync_outbox ORDER BY id ASC");
        sqlx::query_as::<_, OutboxEntry>(&query).fetch_all(pool).await
    }
}
