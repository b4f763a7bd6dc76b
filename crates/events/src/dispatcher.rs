//! Outbox dispatcher.
//!
//! [`OutboxDispatcher`] runs as a background task. On every tick, and
//! whenever a mutation signals new work, it claims a batch of due
//! `sync_outbox` rows and delivers them concurrently through the calendar
//! and email channels. Failures are retried with exponential backoff and
//! dead-lettered after [`OutboxConfig::max_attempts`].

use std::sync::Arc;
use std::time::Duration;

use rollout_core::outbox::{retry_delay, OutboxMessage};
use rollout_db::models::outbox::OutboxEntry;
use rollout_db::repositories::OutboxRepo;
use rollout_db::DbPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::delivery::calendar::{CalendarError, CalendarService};
use crate::delivery::email::{EmailError, NotificationSender};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_BATCH_SIZE: i64 = 50;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ATTEMPTS: u32 = 8;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a single outbox message could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Calendar delivery failed: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Email delivery failed: {0}")]
    Email(#[from] EmailError),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The stored payload no longer decodes.
    #[error("Invalid outbox payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl DeliveryError {
    /// Whether the message should be dead-lettered without further retries.
    pub fn is_permanent(&self) -> bool {
        match self {
            DeliveryError::Calendar(e) => e.is_permanent(),
            DeliveryError::Email(e) => e.is_permanent(),
            DeliveryError::Timeout(_) => false,
            DeliveryError::Payload(_) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// OutboxConfig
// ---------------------------------------------------------------------------

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    /// Upper bound for one remote call.
    pub delivery_timeout: Duration,
    /// Attempts before a message is dead-lettered.
    pub max_attempts: u32,
}

impl OutboxConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                       | Default |
    /// |--------------------------------|---------|
    /// | `OUTBOX_POLL_INTERVAL_SECS`    | `15`    |
    /// | `OUTBOX_BATCH_SIZE`            | `50`    |
    /// | `OUTBOX_DELIVERY_TIMEOUT_SECS` | `10`    |
    /// | `OUTBOX_MAX_ATTEMPTS`          | `8`     |
    pub fn from_env() -> Self {
        fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        Self {
            poll_interval: Duration::from_secs(parsed(
                "OUTBOX_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            batch_size: parsed("OUTBOX_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            delivery_timeout: Duration::from_secs(parsed(
                "OUTBOX_DELIVERY_TIMEOUT_SECS",
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            )),
            max_attempts: parsed("OUTBOX_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
        }
    }

    /// How long a claimed row stays invisible to other dispatchers.
    fn lease(&self) -> Duration {
        self.delivery_timeout * 2 + Duration::from_secs(5)
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// OutboxDispatcher
// ---------------------------------------------------------------------------

/// Counts from one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub delivered: usize,
    pub retried: usize,
    pub dead: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.delivered + self.retried + self.dead
    }
}

enum Outcome {
    Delivered,
    Retried,
    Dead,
}

/// Background service that drains the sync outbox.
pub struct OutboxDispatcher {
    pool: DbPool,
    calendar: Arc<dyn CalendarService>,
    mailer: Arc<dyn NotificationSender>,
    config: OutboxConfig,
    wake: Arc<Notify>,
}

impl OutboxDispatcher {
    pub fn new(
        pool: DbPool,
        calendar: Arc<dyn CalendarService>,
        mailer: Arc<dyn NotificationSender>,
        config: OutboxConfig,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            pool,
            calendar,
            mailer,
            config,
            wake,
        }
    }

    /// Run the dispatcher loop.
    ///
    /// Processes a batch every poll interval and whenever the wake signal
    /// fires. A full batch is followed immediately by another one. The loop
    /// exits gracefully when the provided [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox dispatcher cancelled");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
            }

            loop {
                match self.process_batch().await {
                    Ok(summary) if summary.total() as i64 >= self.config.batch_size => {
                        if cancel.is_cancelled() {
                            break;
                        }
                    }
                    Ok(_) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to process outbox batch");
                        break;
                    }
                }
            }
        }
    }

    /// Claim one batch of due messages and deliver them concurrently.
    pub async fn process_batch(&self) -> Result<BatchSummary, sqlx::Error> {
        let entries =
            OutboxRepo::claim_due(&self.pool, self.config.batch_size, self.config.lease()).await?;
        if entries.is_empty() {
            return Ok(BatchSummary::default());
        }

        let outcomes =
            futures::future::join_all(entries.iter().map(|entry| self.handle(entry))).await;

        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            match outcome? {
                Outcome::Delivered => summary.delivered += 1,
                Outcome::Retried => summary.retried += 1,
                Outcome::Dead => summary.dead += 1,
            }
        }

        tracing::info!(
            delivered = summary.delivered,
            retried = summary.retried,
            dead = summary.dead,
            "Processed outbox batch"
        );
        Ok(summary)
    }

    /// Deliver one entry and record the result.
    async fn handle(&self, entry: &OutboxEntry) -> Result<Outcome, sqlx::Error> {
        let result = match entry.message() {
            Ok(message) => self.deliver_with_timeout(&message).await,
            Err(e) => Err(DeliveryError::Payload(e)),
        };

        let err = match result {
            Ok(()) => {
                OutboxRepo::mark_delivered(&self.pool, entry.id).await?;
                return Ok(Outcome::Delivered);
            }
            Err(e) => e,
        };

        let attempts = u32::try_from(entry.attempts).unwrap_or(0).saturating_add(1);
        if err.is_permanent() || attempts >= self.config.max_attempts {
            tracing::error!(
                outbox_id = entry.id,
                kind = %entry.kind,
                attempts,
                error = %err,
                "Outbox message dead-lettered"
            );
            OutboxRepo::mark_dead(&self.pool, entry.id, &err.to_string()).await?;
            return Ok(Outcome::Dead);
        }

        let delay = retry_delay(attempts);
        tracing::warn!(
            outbox_id = entry.id,
            kind = %entry.kind,
            attempts,
            retry_in_secs = delay.as_secs(),
            error = %err,
            "Outbox delivery failed, retrying"
        );
        OutboxRepo::mark_failed(&self.pool, entry.id, &err.to_string(), delay).await?;
        Ok(Outcome::Retried)
    }

    async fn deliver_with_timeout(&self, message: &OutboxMessage) -> Result<(), DeliveryError> {
        let timeout = self.config.delivery_timeout;
        tokio::time::timeout(timeout, self.deliver(message))
            .await
            .map_err(|_| DeliveryError::Timeout(timeout))?
    }

    async fn deliver(&self, message: &OutboxMessage) -> Result<(), DeliveryError> {
        match message {
            OutboxMessage::UpsertCalendarEvent(event) => {
                self.calendar.upsert_event(event).await?;
            }
            OutboxMessage::DeleteCalendarEvent {
                calendar_id,
                event_id,
            } => {
                self.calendar.delete_event(calendar_id, event_id).await?;
            }
            OutboxMessage::SendNotification(notification) => {
                self.mailer.send(notification).await?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
