//! Teacher double-booking report returned when a reschedule is blocked.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// User-facing message shown above the conflicting class.
pub const CONFLICT_MESSAGE: &str =
    "Teacher already has a class at this time. Please check info below:";

/// The earliest class that collides with the requested slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingClass {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
    pub teacher: String,
    pub subject: String,
}

/// Structured, non-error result of a blocked reschedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Number of colliding classes across all requested dates.
    pub count: i64,
    pub message: String,
    pub class: ConflictingClass,
}

impl ConflictReport {
    pub fn new(count: i64, class: ConflictingClass) -> Self {
        Self {
            count,
            message: CONFLICT_MESSAGE.to_string(),
            class,
        }
    }
}
