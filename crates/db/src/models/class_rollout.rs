//! Class rollout (occurrence) model and DTOs.

use chrono::{NaiveDate, NaiveTime};
use rollout_core::error::CoreError;
use rollout_core::request::ScheduleSlot;
use rollout_core::status::{ClassStatus, StatusId};
use rollout_core::time_range::TimeRange;
use rollout_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `class_rollouts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClassRollout {
    pub id: DbId,
    pub series_id: DbId,
    pub location_id: DbId,
    pub room_id: DbId,
    pub subject_id: DbId,
    pub teacher_id: DbId,
    pub duration_id: DbId,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_capacity: i32,
    pub status_id: StatusId,
    pub comments: String,
    pub show_while_cancelled: bool,
    pub gc_event_id: Option<String>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ClassRollout {
    pub fn status(&self) -> Result<ClassStatus, CoreError> {
        ClassStatus::from_id(self.status_id)
    }

    pub fn time_range(&self) -> Result<TimeRange, CoreError> {
        TimeRange::new(self.start_time, self.end_time)
            .map_err(|e| CoreError::Integrity(format!("class rollout {}: {e}", self.id)))
    }

    /// The schedulable fields, as a reschedule sees them.
    pub fn schedule_slot(&self) -> Result<ScheduleSlot, CoreError> {
        Ok(ScheduleSlot {
            class_date: self.class_date,
            time: self.time_range()?,
            room_id: self.room_id,
            subject_id: self.subject_id,
            teacher_id: self.teacher_id,
            duration_id: self.duration_id,
            capacity: self.max_capacity,
        })
    }
}

/// A rollout joined with the names needed for calendar events and emails.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClassRolloutDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub rollout: ClassRollout,
    pub room_name: String,
    pub subject_name: String,
    pub subject_short_name: String,
    pub teacher_name: String,
    pub teacher_email: String,
    pub duration_short_name: String,
    pub location_short_name: String,
    pub calendar_id: Option<String>,
    pub parent_calendar_id: Option<String>,
}

impl ClassRolloutDetail {
    /// Title of the class calendar event.
    pub fn calendar_title(&self) -> String {
        format!(
            "{} - {} ({})",
            self.subject_short_name, self.teacher_name, self.room_name
        )
    }

    /// Body of the class calendar event.
    pub fn calendar_description(&self) -> String {
        let status = self
            .rollout
            .status()
            .map(|s| s.name())
            .unwrap_or("unknown");
        format!(
            "Subject: {}\nTeacher: {}\nRoom: {}\nLocation: {}\nDuration: {}\nStatus: {}",
            self.subject_name,
            self.teacher_name,
            self.room_name,
            self.location_short_name,
            self.duration_short_name,
            status,
        )
    }
}

/// A busy class of the same teacher that collides with a requested slot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeacherConflict {
    pub id: DbId,
    pub series_id: DbId,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_name: String,
    pub teacher_name: String,
    pub subject_name: String,
}

/// DTO for creating a rollout. Rollouts are generated by the scheduling
/// process; the mutation engine never inserts them.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassRollout {
    pub series_id: DbId,
    pub location_id: DbId,
    pub room_id: DbId,
    pub subject_id: DbId,
    pub teacher_id: DbId,
    pub duration_id: DbId,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_capacity: Option<i32>,
    /// Defaults to 1 (Scheduled) if omitted.
    pub status_id: Option<StatusId>,
    pub gc_event_id: Option<String>,
    pub created_by: Option<DbId>,
}
