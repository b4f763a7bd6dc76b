//! Student enrollment (`student_in_class`) model and DTOs.

use chrono::{NaiveDate, NaiveTime};
use rollout_core::enrollment::Placement;
use rollout_core::error::CoreError;
use rollout_core::status::{EnrollmentStatus, StatusId};
use rollout_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `student_in_class` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enrollment {
    pub id: DbId,
    pub student_id: DbId,
    pub current_occurrence_id: Option<DbId>,
    pub previous_occurrence_id: Option<DbId>,
    pub status_id: StatusId,
    pub comments: String,
    pub status_comments: String,
    pub gc_parent_event_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Enrollment {
    pub fn status(&self) -> Result<EnrollmentStatus, CoreError> {
        EnrollmentStatus::from_id(self.status_id)
    }

    /// Decode the stored columns into a [`Placement`].
    pub fn placement(&self) -> Result<Placement, CoreError> {
        Placement::from_columns(
            self.status()?,
            self.current_occurrence_id,
            self.previous_occurrence_id,
        )
    }
}

/// An enrollment joined with what its parent-calendar entry shows.
///
/// The class columns come from the current occurrence, or the previous one
/// when the student is away.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentDetail {
    pub id: DbId,
    pub student_id: DbId,
    pub student_name: String,
    pub status_id: StatusId,
    pub status_comments: String,
    pub gc_parent_event_id: Option<String>,
    pub parent_calendar_id: Option<String>,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_name: String,
    pub teacher_name: String,
}

impl EnrollmentDetail {
    pub fn calendar_title(&self) -> String {
        format!("{}: {}", self.student_name, self.subject_name)
    }

    pub fn calendar_description(&self) -> String {
        let status = EnrollmentStatus::from_id(self.status_id)
            .map(|s| s.name())
            .unwrap_or("unknown");
        let mut description = format!(
            "Student: {}\nSubject: {}\nTeacher: {}\nStatus: {}",
            self.student_name, self.subject_name, self.teacher_name, status
        );
        if !self.status_comments.is_empty() {
            description.push_str("\nNote: ");
            description.push_str(&self.status_comments);
        }
        description
    }
}

/// A break-status enrollment together with the date of the class it left.
#[derive(Debug, Clone, FromRow)]
pub struct BreakChainLink {
    pub id: DbId,
    pub previous_class_date: NaiveDate,
}

/// DTO for enrolling a student into an occurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnrollment {
    pub student_id: DbId,
    pub occurrence_id: DbId,
    pub gc_parent_event_id: Option<String>,
}
