//! Reference entities a rollout points at.
//!
//! These tables are owned by the wider platform; the rollout service reads
//! them and tests create them.

use rollout_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `staff` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Staff {
    pub id: DbId,
    pub full_name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: DbId,
    pub short_name: String,
    pub calendar_id: Option<String>,
    pub parent_calendar_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Entities a reschedule may point a rollout at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Room,
    Subject,
    Teacher,
    Duration,
}

impl ReferenceKind {
    /// Backing table. Only ever interpolated from this fixed set.
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Room => "rooms",
            ReferenceKind::Subject => "subjects",
            ReferenceKind::Teacher => "staff",
            ReferenceKind::Duration => "class_durations",
        }
    }

    /// Entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            ReferenceKind::Room => "Room",
            ReferenceKind::Subject => "Subject",
            ReferenceKind::Teacher => "Teacher",
            ReferenceKind::Duration => "ClassDuration",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocation {
    pub short_name: String,
    pub calendar_id: Option<String>,
    pub parent_calendar_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaff {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubject {
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassDuration {
    pub duration_short_name: String,
    pub minutes: i32,
}
