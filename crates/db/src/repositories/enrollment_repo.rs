//! Repository for the `student_in_class` table.

use rollout_core::enrollment::Placement;
use rollout_core::recurrence::DateRange;
use rollout_core::status::{EnrollmentStatus, StatusId};
use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::enrollment::{BreakChainLink, CreateEnrollment, Enrollment, EnrollmentDetail};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, student_id, current_occurrence_id, previous_occurrence_id, \
    status_id, comments, status_comments, gc_parent_event_id, created_at, updated_at";

/// Provides reads and engine-scoped mutations for enrollments.
pub struct EnrollmentRepo;

impl EnrollmentRepo {
    /// Enroll a student into an occurrence as scheduled.
    pub async fn create(pool: &PgPool, input: &CreateEnrollment) -> Result<Enrollment, sqlx::Error> {
        let query = format!(
            "INSERT INTO student_in_class (student_id, current_occurrence_id, gc_parent_event_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(input.student_id)
            .bind(input.occurrence_id)
            .bind(&input.gc_parent_event_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM student_in_class WHERE id = $1");
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock the enrollment of `student_id` attending `occurrence_id`.
    pub async fn find_attending_for_student(
        conn: &mut PgConnection,
        occurrence_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_in_class
             WHERE current_occurrence_id = $1 AND student_id = $2
             ORDER BY id ASC
             LIMIT 1
             FOR UPDATE"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(occurrence_id)
            .bind(student_id)
            .fetch_optional(conn)
            .await
    }

    /// Lock the enrollment of `student_id` that left `occurrence_id`.
    pub async fn find_away_for_student(
        conn: &mut PgConnection,
        occurrence_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_in_class
             WHERE previous_occurrence_id = $1 AND student_id = $2
             ORDER BY id ASC
             LIMIT 1
             FOR UPDATE"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(occurrence_id)
            .bind(student_id)
            .fetch_optional(conn)
            .await
    }

    /// Lock every enrollment attending one of `occurrence_ids`.
    ///
    /// When `student_id` is given only that student's enrollments are
    /// returned.
    pub async fn list_attending_in(
        conn: &mut PgConnection,
        occurrence_ids: &[DbId],
        student_id: Option<DbId>,
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_in_class
             WHERE current_occurrence_id = ANY($1)
               AND ($2::BIGINT IS NULL OR student_id = $2)
             ORDER BY id ASC
             FOR UPDATE"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(occurrence_ids)
            .bind(student_id)
            .fetch_all(conn)
            .await
    }

    /// Lock every enrollment of `student_id` that left one of
    /// `occurrence_ids` with one of `statuses`.
    pub async fn list_away_in(
        conn: &mut PgConnection,
        occurrence_ids: &[DbId],
        student_id: DbId,
        statuses: &[StatusId],
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_in_class
             WHERE previous_occurrence_id = ANY($1)
               AND student_id = $2
               AND status_id = ANY($3)
             ORDER BY id ASC
             FOR UPDATE"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(occurrence_ids)
            .bind(student_id)
            .bind(statuses)
            .fetch_all(conn)
            .await
    }

    /// Lock the student's other break enrollments in `series_id` that carry
    /// `note` and left an occurrence outside `range`.
    ///
    /// These belong to the same break as the one being restored; their note
    /// is rewritten once part of the break is undone.
    pub async fn list_break_chain(
        conn: &mut PgConnection,
        student_id: DbId,
        series_id: DbId,
        note: &str,
        range: DateRange,
    ) -> Result<Vec<BreakChainLink>, sqlx::Error> {
        sqlx::query_as::<_, BreakChainLink>(
            "SELECT sic.id, cr.class_date AS previous_class_date \
             FROM student_in_class sic \
             JOIN class_rollouts cr ON cr.id = sic.previous_occurrence_id \
             WHERE sic.student_id = $1 \
               AND sic.status_id = $2 \
               AND sic.status_comments = $3 \
               AND cr.class_date NOT BETWEEN $4 AND $5 \
               AND cr.series_id = $6 \
             ORDER BY cr.class_date ASC, sic.id ASC \
             FOR UPDATE OF sic",
        )
        .bind(student_id)
        .bind(EnrollmentStatus::Break.id())
        .bind(note)
        .bind(range.start())
        .bind(range.end())
        .bind(series_id)
        .fetch_all(conn)
        .await
    }

    /// Overwrite the status note on a set of enrollments.
    pub async fn set_status_comments(
        conn: &mut PgConnection,
        ids: &[DbId],
        note: &str,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE student_in_class SET status_comments = $2 WHERE id = ANY($1)")
                .bind(ids)
                .bind(note)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Persist a placement.
    ///
    /// `comments` and `status_comments` are only written when `Some`.
    pub async fn apply_placement(
        conn: &mut PgConnection,
        id: DbId,
        placement: &Placement,
        comments: Option<&str>,
        status_comments: Option<&str>,
    ) -> Result<Enrollment, sqlx::Error> {
        let query = format!(
            "UPDATE student_in_class SET
                status_id = $2,
                current_occurrence_id = $3,
                previous_occurrence_id = $4,
                comments = COALESCE($5, comments),
                status_comments = COALESCE($6, status_comments)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(placement.status().id())
            .bind(placement.current_occurrence_id())
            .bind(placement.previous_occurrence_id())
            .bind(comments)
            .bind(status_comments)
            .fetch_one(conn)
            .await
    }

    /// Number of enrollments attending an occurrence.
    pub async fn count_attending(
        conn: &mut PgConnection,
        occurrence_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM student_in_class WHERE current_occurrence_id = $1",
        )
        .bind(occurrence_id)
        .fetch_one(conn)
        .await
    }

    /// Load enrollments with the class they are tied to, for calendar sync.
    pub async fn list_details(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<EnrollmentDetail>, sqlx::Error> {
        sqlx::query_as::<_, EnrollmentDetail>(
            "SELECT sic.id, sic.student_id, st.full_name AS student_name, sic.status_id, \
                    sic.status_comments, sic.gc_parent_event_id, l.parent_calendar_id, \
                    cr.class_date, cr.start_time, cr.end_time, \
                    sub.name AS subject_name, s.full_name AS teacher_name \
             FROM student_in_class sic \
             JOIN students st ON st.id = sic.student_id \
             JOIN class_rollouts cr \
                  ON cr.id = COALESCE(sic.current_occurrence_id, sic.previous_occurrence_id) \
             JOIN locations l ON l.id = cr.location_id \
             JOIN subjects sub ON sub.id = cr.subject_id \
             JOIN staff s ON s.id = cr.teacher_id \
             WHERE sic.id = ANY($1) \
             ORDER BY cr.class_date ASC, sic.id ASC",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }
}
