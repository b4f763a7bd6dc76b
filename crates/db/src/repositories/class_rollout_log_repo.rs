//! Repository for the write-once `class_rollout_logs` table.

use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::rollout_log::ClassRolloutLog;

const COLUMNS: &str = "id, class_rollout_id, modified_by, modified_at, series_id, location_id, \
    room_id, subject_id, teacher_id, duration_id, class_date, start_time, end_time, \
    max_capacity, status_id, comments, show_while_cancelled, gc_event_id, created_by, \
    rollout_created_at";

/// Provides append and read access to rollout snapshots. There is no update
/// or delete; the table rejects both.
pub struct ClassRolloutLogRepo;

impl ClassRolloutLogRepo {
    /// Copy the rollout's current row into the log before it is mutated.
    pub async fn snapshot(
        conn: &mut PgConnection,
        rollout_id: DbId,
        modified_by: DbId,
    ) -> Result<ClassRolloutLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO class_rollout_logs
                (class_rollout_id, modified_by, series_id, location_id, room_id, subject_id,
                 teacher_id, duration_id, class_date, start_time, end_time, max_capacity,
                 status_id, comments, show_while_cancelled, gc_event_id, created_by,
                 rollout_created_at)
             SELECT id, $2, series_id, location_id, room_id, subject_id,
                    teacher_id, duration_id, class_date, start_time, end_time, max_capacity,
                    status_id, comments, show_while_cancelled, gc_event_id, created_by,
                    created_at
             FROM class_rollouts
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassRolloutLog>(&query)
            .bind(rollout_id)
            .bind(modified_by)
            .fetch_one(conn)
            .await
    }

    /// List snapshots of a rollout, newest first.
    pub async fn list_for_rollout(
        pool: &PgPool,
        rollout_id: DbId,
    ) -> Result<Vec<ClassRolloutLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM class_rollout_logs
             WHERE class_rollout_id = $1
             ORDER BY modified_at DESC, id DESC"
        );
        sqlx::query_as::<_, ClassRolloutLog>(&query)
            .bind(rollout_id)
            .fetch_all(pool)
            .await
    }
}
