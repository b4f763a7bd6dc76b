//! Outbound side effects queued by rollout mutations.
//!
//! Messages are written to the `sync_outbox` table in the same transaction as
//! the mutation that produced them and delivered later by the dispatcher in
//! `rollout-events`. The JSON shape is the stored payload, so variants and
//! field names must stay backward compatible.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Base delay before the first retry of a failed delivery.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(30);

/// Upper bound for the retry delay.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(3600);

/// Date format used in notification emails.
pub const NOTICE_DATE_FORMAT: &str = "%m/%d/%Y";

/// A pending outbound operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboxMessage {
    UpsertCalendarEvent(CalendarEvent),
    DeleteCalendarEvent { calendar_id: String, event_id: String },
    SendNotification(Notification),
}

impl OutboxMessage {
    /// Stable short name, also stored in the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboxMessage::UpsertCalendarEvent(_) => "upsert_calendar_event",
            OutboxMessage::DeleteCalendarEvent { .. } => "delete_calendar_event",
            OutboxMessage::SendNotification(_) => "send_notification",
        }
    }
}

/// A calendar entry as the remote calendar service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    pub calendar_id: String,
    pub name: String,
    pub description: String,
    pub attendees: Vec<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// An email to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub notice: Notice,
}

/// Notification templates and their fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Notice {
    /// One or more occurrences were cancelled.
    ClassDeleted {
        class_date: String,
        subject: String,
        location: String,
        reason: Option<String>,
        permanently: bool,
        cancelled_count: usize,
        changed_by: String,
    },
    /// One or more occurrences were modified.
    ClassChanged {
        class_date: String,
        subject: String,
        location: String,
        affected_count: usize,
        changed_by: String,
    },
    /// A revert pushed an occurrence over its capacity.
    CapacityExceeded {
        classes: Vec<CapacityInfo>,
        changed_by: String,
    },
}

impl Notice {
    pub fn template(&self) -> &'static str {
        match self {
            Notice::ClassDeleted { .. } => "class_deleted",
            Notice::ClassChanged { .. } => "class_changed",
            Notice::CapacityExceeded { .. } => "capacity_exceeded",
        }
    }
}

/// One over-capacity occurrence in a capacity warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityInfo {
    pub class_date: String,
    pub location: String,
    pub duration: String,
    pub subject: String,
    pub teacher: String,
    pub enrolled: i64,
    pub capacity: i32,
}

/// Format a class date the way notification emails show it.
pub fn notice_date(date: NaiveDate) -> String {
    date.format(NOTICE_DATE_FORMAT).to_string()
}

/// Delay before retrying a delivery that has failed `attempts` times.
///
/// Doubles from [`RETRY_BASE_DELAY`] and is capped at [`RETRY_MAX_DELAY`].
pub fn retry_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    RETRY_BASE_DELAY
        .saturating_mul(1u32 << exponent)
        .min(RETRY_MAX_DELAY)
}
