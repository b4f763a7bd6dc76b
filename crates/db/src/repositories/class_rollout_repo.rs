//! Repository for the `class_rollouts` table.

use chrono::NaiveDate;
use rollout_core::recurrence::DateRange;
use rollout_core::request::ScheduleSlot;
use rollout_core::status::ClassStatus;
use rollout_core::time_range::TimeRange;
use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::class_rollout::{
    ClassRollout, ClassRolloutDetail, CreateClassRollout, TeacherConflict,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, series_id, location_id, room_id, subject_id, teacher_id, \
    duration_id, class_date, start_time, end_time, max_capacity, status_id, comments, \
    show_while_cancelled, gc_event_id, created_by, created_at, updated_at";

/// Rollout columns plus joined names, for [`ClassRolloutDetail`].
const DETAIL_SELECT: &str = "SELECT \
        cr.id, cr.series_id, cr.location_id, cr.room_id, cr.subject_id, cr.teacher_id, \
        cr.duration_id, cr.class_date, cr.start_time, cr.end_time, cr.max_capacity, \
        cr.status_id, cr.comments, cr.show_while_cancelled, cr.gc_event_id, cr.created_by, \
        cr.created_at, cr.updated_at, \
        r.room_name, \
        sub.name AS subject_name, sub.short_name AS subject_short_name, \
        s.full_name AS teacher_name, s.email AS teacher_email, \
        d.duration_short_name, \
        l.short_name AS location_short_name, l.calendar_id, l.parent_calendar_id \
    FROM class_rollouts cr \
    JOIN rooms r ON r.id = cr.room_id \
    JOIN subjects sub ON sub.id = cr.subject_id \
    JOIN staff s ON s.id = cr.teacher_id \
    JOIN class_durations d ON d.id = cr.duration_id \
    JOIN locations l ON l.id = cr.location_id";

/// Provides reads and engine-scoped mutations for class rollouts.
pub struct ClassRolloutRepo;

impl ClassRolloutRepo {
    /// Insert a new rollout, returning the created row.
    ///
    /// If `status_id` is `None`, defaults to 1 (Scheduled).
    pub async fn create(
        pool: &PgPool,
        input: &CreateClassRollout,
    ) -> Result<ClassRollout, sqlx::Error> {
        let query = format!(
            "INSERT INTO class_rollouts
                (series_id, location_id, room_id, subject_id, teacher_id, duration_id,
                 class_date, start_time, end_time, max_capacity, status_id, gc_event_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 0), COALESCE($11, 1), $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(input.series_id)
            .bind(input.location_id)
            .bind(input.room_id)
            .bind(input.subject_id)
            .bind(input.teacher_id)
            .bind(input.duration_id)
            .bind(input.class_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.max_capacity)
            .bind(input.status_id)
            .bind(&input.gc_event_id)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a rollout by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClassRollout>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM class_rollouts WHERE id = $1");
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a rollout and lock its row until the transaction ends.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ClassRollout>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM class_rollouts WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Load rollouts with their joined names, ordered by date.
    pub async fn list_details(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<ClassRolloutDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} WHERE cr.id = ANY($1) ORDER BY cr.class_date, cr.start_time, cr.id"
        );
        sqlx::query_as::<_, ClassRolloutDetail>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    /// Load one rollout with its joined names.
    pub async fn find_detail(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ClassRolloutDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE cr.id = $1");
        sqlx::query_as::<_, ClassRolloutDetail>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock and list every rollout of a series on or after `from`, by date.
    pub async fn list_series_from(
        conn: &mut PgConnection,
        series_id: DbId,
        from: NaiveDate,
    ) -> Result<Vec<ClassRollout>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM class_rollouts
             WHERE series_id = $1 AND class_date >= $2
             ORDER BY class_date ASC, id ASC
             FOR UPDATE"
        );
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(series_id)
            .bind(from)
            .fetch_all(conn)
            .await
    }

    /// Lock and list every rollout of a series inside `range`, by date.
    pub async fn list_series_between(
        conn: &mut PgConnection,
        series_id: DbId,
        range: DateRange,
    ) -> Result<Vec<ClassRollout>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM class_rollouts
             WHERE series_id = $1 AND class_date BETWEEN $2 AND $3
             ORDER BY class_date ASC, id ASC
             FOR UPDATE"
        );
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(series_id)
            .bind(range.start())
            .bind(range.end())
            .fetch_all(conn)
            .await
    }

    /// Serialize mutations of the series `id` belongs to until the
    /// transaction ends, and return that series.
    ///
    /// Taken before any rollout row is locked, so operations that lock
    /// several rows of one series never wait on each other mid-way.
    pub async fn lock_series_of(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let series_id: Option<DbId> =
            sqlx::query_scalar("SELECT series_id FROM class_rollouts WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some(series_id) = series_id {
            sqlx::query(
                "SELECT pg_advisory_xact_lock(hashtextextended('class_rollouts.series', $1))",
            )
            .bind(series_id)
            .execute(conn)
            .await?;
        }
        Ok(series_id)
    }

    /// Serialize schedule changes for one teacher until the transaction ends.
    ///
    /// Two transactions that both check and then book the same teacher take
    /// this lock first, so the second one sees the first one's booking.
    pub async fn lock_teacher_schedule(
        conn: &mut PgConnection,
        teacher_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended('class_rollouts.teacher', $1))")
            .bind(teacher_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Busy classes of `teacher_id` on `dates` whose time overlaps `time`.
    ///
    /// Classes of `exclude_series_id` are ignored. Overlap is half-open:
    /// a class ending exactly when `time` starts does not collide.
    pub async fn find_teacher_conflicts(
        conn: &mut PgConnection,
        teacher_id: DbId,
        dates: &[NaiveDate],
        time: TimeRange,
        exclude_series_id: DbId,
    ) -> Result<Vec<TeacherConflict>, sqlx::Error> {
        sqlx::query_as::<_, TeacherConflict>(
            "SELECT cr.id, cr.series_id, cr.class_date, cr.start_time, cr.end_time, \
                    r.room_name, s.full_name AS teacher_name, sub.name AS subject_name \
             FROM class_rollouts cr \
             JOIN rooms r ON r.id = cr.room_id \
             JOIN staff s ON s.id = cr.teacher_id \
             JOIN subjects sub ON sub.id = cr.subject_id \
             WHERE cr.teacher_id = $1 \
               AND cr.class_date = ANY($2) \
               AND cr.status_id = ANY($3) \
               AND cr.series_id <> $4 \
               AND cr.start_time < $6 \
               AND cr.end_time > $5 \
             ORDER BY cr.class_date, cr.start_time, cr.id",
        )
        .bind(teacher_id)
        .bind(dates)
        .bind(ClassStatus::teacher_busy_ids())
        .bind(exclude_series_id)
        .bind(time.start())
        .bind(time.end())
        .fetch_all(conn)
        .await
    }

    /// Mark a rollout cancelled with a reason.
    pub async fn cancel(
        conn: &mut PgConnection,
        id: DbId,
        reason: &str,
        show_while_cancelled: bool,
    ) -> Result<ClassRollout, sqlx::Error> {
        let query = format!(
            "UPDATE class_rollouts SET
                status_id = $2,
                comments = $3,
                show_while_cancelled = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(id)
            .bind(ClassStatus::Cancelled.id())
            .bind(reason)
            .bind(show_while_cancelled)
            .fetch_one(conn)
            .await
    }

    /// Write a new slot onto a rollout and mark it modified.
    pub async fn apply_schedule(
        conn: &mut PgConnection,
        id: DbId,
        slot: &ScheduleSlot,
    ) -> Result<ClassRollout, sqlx::Error> {
        let query = format!(
            "UPDATE class_rollouts SET
                class_date = $2,
                start_time = $3,
                end_time = $4,
                room_id = $5,
                subject_id = $6,
                teacher_id = $7,
                duration_id = $8,
                max_capacity = $9,
                status_id = $10
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassRollout>(&query)
            .bind(id)
            .bind(slot.class_date)
            .bind(slot.time.start())
            .bind(slot.time.end())
            .bind(slot.room_id)
            .bind(slot.subject_id)
            .bind(slot.teacher_id)
            .bind(slot.duration_id)
            .bind(slot.capacity)
            .bind(ClassStatus::Modified.id())
            .fetch_one(conn)
            .await
    }
}
