#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use http_body_util::BodyExt;
use rollout_api::auth::jwt::{generate_access_token, JwtConfig};
use rollout_api::config::ServerConfig;
use rollout_api::router::build_app_router;
use rollout_api::state::AppState;
use rollout_core::roles::{ROLE_MANAGER, ROLE_TEACHER};
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::{ClassRollout, CreateClassRollout};
use rollout_db::models::enrollment::{CreateEnrollment, Enrollment};
use rollout_db::models::reference::{
    CreateClassDuration, CreateLocation, CreateStaff, CreateSubject,
};
use rollout_db::repositories::{ClassRolloutRepo, EnrollmentRepo, ReferenceRepo};
use sqlx::PgPool;
use tokio::sync::Notify;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        database_url: String::new(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout: Duration::from_secs(30),
        shutdown_timeout: Duration::from_secs(30),
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            issuer: "class-rollouts".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        outbox_signal: Arc::new(Notify::new()),
    };
    build_app_router(state, &config)
}

pub fn token(staff_id: DbId, role: &str) -> String {
    generate_access_token(staff_id, role, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Reference rows shared by every rollout a test creates.
pub struct World {
    pub location_id: DbId,
    pub room_id: DbId,
    pub subject_id: DbId,
    pub duration_id: DbId,
    pub teacher_id: DbId,
    pub manager_id: DbId,
    pub teacher_token: String,
    pub manager_token: String,
}

pub async fn seed_world(pool: &PgPool) -> World {
    let location = ReferenceRepo::create_location(
        pool,
        &CreateLocation {
            short_name: "Downtown".into(),
            calendar_id: Some("cal-downtown".into()),
            parent_calendar_id: Some("cal-parents".into()),
        },
    )
    .await
    .unwrap();
    let room_id = ReferenceRepo::create_room(pool, location.id, "Room A")
        .await
        .unwrap();
    let subject_id = ReferenceRepo::create_subject(
        pool,
        &CreateSubject {
            name: "Piano".into(),
            short_name: "PNO".into(),
        },
    )
    .await
    .unwrap();
    let duration_id = ReferenceRepo::create_duration(
        pool,
        &CreateClassDuration {
            duration_short_name: "60m".into(),
            minutes: 60,
        },
    )
    .await
    .unwrap();
    let teacher = ReferenceRepo::create_staff(
        pool,
        &CreateStaff {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
        },
    )
    .await
    .unwrap();
    let manager = ReferenceRepo::create_staff(
        pool,
        &CreateStaff {
            full_name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
        },
    )
    .await
    .unwrap();

    World {
        location_id: location.id,
        room_id,
        subject_id,
        duration_id,
        teacher_id: teacher.id,
        manager_id: manager.id,
        teacher_token: token(teacher.id, ROLE_TEACHER),
        manager_token: token(manager.id, ROLE_MANAGER),
    }
}

impl World {
    pub async fn series(&self, pool: &PgPool, title: &str) -> DbId {
        ReferenceRepo::create_series(pool, self.location_id, title)
            .await
            .unwrap()
    }

    /// One rollout taught by the seeded teacher, capacity 2.
    pub async fn rollout(
        &self,
        pool: &PgPool,
        series_id: DbId,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> ClassRollout {
        ClassRolloutRepo::create(
            pool,
            &CreateClassRollout {
                series_id,
                location_id: self.location_id,
                room_id: self.room_id,
                subject_id: self.subject_id,
                teacher_id: self.teacher_id,
                duration_id: self.duration_id,
                class_date: date,
                start_time: start,
                end_time: end,
                max_capacity: Some(2),
                status_id: None,
                gc_event_id: Some(format!("evt-{series_id}-{date}")),
                created_by: None,
            },
        )
        .await
        .unwrap()
    }

    /// `count` weekly rollouts from `first`, 10:00 to 11:00.
    pub async fn weekly(
        &self,
        pool: &PgPool,
        series_id: DbId,
        first: NaiveDate,
        count: usize,
    ) -> Vec<ClassRollout> {
        let mut rollouts = Vec::with_capacity(count);
        for date in rollout_core::recurrence::weekly_dates(first, count) {
            rollouts.push(self.rollout(pool, series_id, date, t(10, 0), t(11, 0)).await);
        }
        rollouts
    }
}

pub async fn student(pool: &PgPool, name: &str) -> DbId {
    ReferenceRepo::create_student(pool, name).await.unwrap()
}

pub async fn enroll(pool: &PgPool, student_id: DbId, occurrence_id: DbId) -> Enrollment {
    EnrollmentRepo::create(
        pool,
        &CreateEnrollment {
            student_id,
            occurrence_id,
            gc_parent_event_id: Some(format!("parent-{student_id}-{occurrence_id}")),
        },
    )
    .await
    .unwrap()
}
