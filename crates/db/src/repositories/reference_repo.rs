//! Repository for the reference tables a rollout points at.

use rollout_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::reference::{
    CreateClassDuration, CreateLocation, CreateStaff, CreateSubject, Location, ReferenceKind,
    Staff,
};

const STAFF_COLUMNS: &str = "id, full_name, email, created_at, updated_at";
const LOCATION_COLUMNS: &str =
    "id, short_name, calendar_id, parent_calendar_id, created_at, updated_at";

pub struct ReferenceRepo;

impl ReferenceRepo {
    pub async fn create_location(
        pool: &PgPool,
        input: &CreateLocation,
    ) -> Result<Location, sqlx::Error> {
        let query = format!(
            "INSERT INTO locations (short_name, calendar_id, parent_calendar_id)
             VALUES ($1, $2, $3)
             RETURNING {LOCATION_COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(&input.short_name)
            .bind(&input.calendar_id)
            .bind(&input.parent_calendar_id)
            .fetch_one(pool)
            .await
    }

    pub async fn create_room(
        pool: &PgPool,
        location_id: DbId,
        room_name: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO rooms (location_id, room_name) VALUES ($1, $2) RETURNING id")
            .bind(location_id)
            .bind(room_name)
            .fetch_one(pool)
            .await
    }

    pub async fn create_subject(pool: &PgPool, input: &CreateSubject) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO subjects (name, short_name) VALUES ($1, $2) RETURNING id")
            .bind(&input.name)
            .bind(&input.short_name)
            .fetch_one(pool)
            .await
    }

    pub async fn create_staff(pool: &PgPool, input: &CreateStaff) -> Result<Staff, sqlx::Error> {
        let query = format!(
            "INSERT INTO staff (full_name, email) VALUES ($1, $2) RETURNING {STAFF_COLUMNS}"
        );
        sqlx::query_as::<_, Staff>(&query)
            .bind(&input.full_name)
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    pub async fn create_duration(
        pool: &PgPool,
        input: &CreateClassDuration,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO class_durations (duration_short_name, minutes) VALUES ($1, $2) RETURNING id",
        )
        .bind(&input.duration_short_name)
        .bind(input.minutes)
        .fetch_one(pool)
        .await
    }

    pub async fn create_student(pool: &PgPool, full_name: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO students (full_name) VALUES ($1) RETURNING id")
            .bind(full_name)
            .fetch_one(pool)
            .await
    }

    pub async fn create_series(
        pool: &PgPool,
        location_id: DbId,
        title: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO class_series (location_id, title) VALUES ($1, $2) RETURNING id",
        )
        .bind(location_id)
        .bind(title)
        .fetch_one(pool)
        .await
    }

    /// Find a staff member, used to resolve the acting user's name.
    pub async fn find_staff(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Staff>, sqlx::Error> {
        let query = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1");
        sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Whether a referenced row exists.
    pub async fn exists(
        conn: &mut PgConnection,
        kind: ReferenceKind,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", kind.table());
        sqlx::query_scalar(&query).bind(id).fetch_one(conn).await
    }
}
