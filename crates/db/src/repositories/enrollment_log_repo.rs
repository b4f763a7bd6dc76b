//! Repository for the `student_in_class_logs` table.

use rollout_core::enrollment::Placement;
use rollout_core::status::EnrollmentStatus;
use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::rollout_log::StudentInClassLog;

const COLUMNS: &str = "id, student_in_class_id, modified_by, modified_at, from_status_id, \
    status_id, current_occurrence_id, previous_occurrence_id";

pub struct EnrollmentLogRepo;

impl EnrollmentLogRepo {
    /// Record one enrollment transition, with the placement it ended in.
    pub async fn record(
        conn: &mut PgConnection,
        enrollment_id: DbId,
        modified_by: DbId,
        from: EnrollmentStatus,
        to: &Placement,
    ) -> Result<StudentInClassLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO student_in_class_logs
                (student_in_class_id, modified_by, from_status_id, status_id,
                 current_occurrence_id, previous_occurrence_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StudentInClassLog>(&query)
            .bind(enrollment_id)
            .bind(modified_by)
            .bind(from.id())
            .bind(to.status().id())
            .bind(to.current_occurrence_id())
            .bind(to.previous_occurrence_id())
            .fetch_one(conn)
            .await
    }

    /// Transitions of one enrollment in the order they happened.
    pub async fn list_for_enrollment(
        pool: &PgPool,
        enrollment_id: DbId,
    ) -> Result<Vec<StudentInClassLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_in_class_logs
             WHERE student_in_class_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, StudentInClassLog>(&query)
            .bind(enrollment_id)
            .fetch_all(pool)
            .await
    }
}
