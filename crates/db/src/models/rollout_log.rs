//! Write-once audit rows for rollouts and enrollments.

use chrono::{NaiveDate, NaiveTime};
use rollout_core::status::StatusId;
use rollout_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `class_rollout_logs`: the rollout as it was before a mutation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClassRolloutLog {
    pub id: DbId,
    pub class_rollout_id: DbId,
    pub modified_by: DbId,
    pub modified_at: Timestamp,
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
    pub rollout_created_at: Timestamp,
}

/// A row from `student_in_class_logs`: one enrollment status change.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentInClassLog {
    pub id: DbId,
    pub student_in_class_id: DbId,
    pub modified_by: DbId,
    pub modified_at: Timestamp,
    pub from_status_id: StatusId,
    pub status_id: StatusId,
    pub current_occurrence_id: Option<DbId>,
    pub previous_occurrence_id: Option<DbId>,
}
