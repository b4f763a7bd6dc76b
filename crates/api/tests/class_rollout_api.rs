//! HTTP-level integration tests for the `/class-rollouts` resource.
//!
//! Every test drives the full router and then inspects the database: the
//! rollout rows, enrollments, audit logs and the queued outbox messages.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{
    body_json, d, delete_auth, delete_json_auth, enroll, get, get_auth, put_json_auth,
    seed_world, student, t,
};
use rollout_core::status::{ClassStatus, EnrollmentStatus};
use rollout_core::types::DbId;
use rollout_db::repositories::{
    ClassRolloutLogRepo, ClassRolloutRepo, EnrollmentLogRepo, EnrollmentRepo, OutboxRepo,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rollout_uri(id: DbId) -> String {
    format!("/api/v1/class-rollouts/{id}")
}

async fn log_count(pool: &PgPool, id: DbId) -> usize {
    ClassRolloutLogRepo::list_for_rollout(pool, id)
        .await
        .unwrap()
        .len()
}

/// Queued outbox payloads of one kind, oldest first.
async fn outbox(pool: &PgPool, kind: &str) -> Vec<serde_json::Value> {
    OutboxRepo::list_all(pool)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.kind == kind)
        .map(|entry| entry.payload)
        .collect()
}

async fn notices(pool: &PgPool, template: &str) -> Vec<serde_json::Value> {
    outbox(pool, "send_notification")
        .await
        .into_iter()
        .filter(|payload| payload["notice"]["template"] == template)
        .collect()
}

// ---------------------------------------------------------------------------
// Auth and retrieval
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn requests_without_token_are_unauthorized(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool);

    let response = get(app, &rollout_uri(rollout.id)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_role_is_forbidden(pool: PgPool) {
    let world = seed_world(&pool).await;
    let app = common::build_test_app(pool);
    let token = common::token(world.teacher_id, "student");

    let response = get_auth(app, &rollout_uri(1), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_returns_rollout_with_names(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, &rollout_uri(rollout.id), &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], rollout.id);
    assert_eq!(json["data"]["class_date"], "2024-01-10");
    assert_eq!(json["data"]["room_name"], "Room A");
    assert_eq!(json["data"]["teacher_name"], "Ada Lovelace");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_unknown_rollout_is_404(pool: PgPool) {
    let world = seed_world(&pool).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, &rollout_uri(999_999), &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Reschedule
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn overlapping_reschedule_is_blocked_and_changes_nothing(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series_a = world.series(&pool, "A").await;
    let series_b = world.series(&pool, "B").await;
    world
        .rollout(&pool, series_a, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let b = world
        .rollout(&pool, series_b, d(2024, 1, 3), t(9, 0), t(10, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    let body = json!({"class_date": "2024-01-10", "start_time": "10:30", "end_time": "11:30"});
    let response = put_json_auth(app, &rollout_uri(b.id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["outcome"], "blocked");
    let conflict = &json["data"]["conflict"];
    assert_eq!(conflict["count"], 1);
    assert_eq!(
        conflict["message"],
        "Teacher already has a class at this time. Please check info below:"
    );
    assert_eq!(conflict["class"]["date"], "2024-01-10");
    assert_eq!(conflict["class"]["start_time"], "10:00:00");
    assert_eq!(conflict["class"]["room"], "Room A");
    assert_eq!(conflict["class"]["teacher"], "Ada Lovelace");
    assert_eq!(conflict["class"]["subject"], "Piano");

    let unchanged = ClassRolloutRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    assert_eq!(unchanged.class_date, d(2024, 1, 3));
    assert_eq!(unchanged.start_time, t(9, 0));
    assert_eq!(unchanged.end_time, t(10, 0));
    assert_eq!(unchanged.status_id, ClassStatus::Scheduled.id());
    assert_eq!(log_count(&pool, b.id).await, 0);
    assert!(OutboxRepo::list_all(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn adjacent_reschedule_is_applied(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series_a = world.series(&pool, "A").await;
    let series_b = world.series(&pool, "B").await;
    world
        .rollout(&pool, series_a, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let b = world
        .rollout(&pool, series_b, d(2024, 1, 3), t(9, 0), t(10, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    let body = json!({"class_date": "2024-01-10", "start_time": "11:00", "end_time": "12:00"});
    let response = put_json_auth(app, &rollout_uri(b.id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["outcome"], "updated");
    assert_eq!(json["data"]["operation"], "reschedule");

    let moved = ClassRolloutRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    assert_eq!(moved.class_date, d(2024, 1, 10));
    assert_eq!(moved.start_time, t(11, 0));
    assert_eq!(moved.status_id, ClassStatus::Modified.id());
    assert_eq!(log_count(&pool, b.id).await, 1);

    let upserts = outbox(&pool, "upsert_calendar_event").await;
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0]["event_id"], format!("evt-{series_b}-2024-01-03"));
    assert_eq!(upserts[0]["start_time"], "11:00:00");
    assert_eq!(upserts[0]["attendees"], json!(["ada@example.com"]));

    let changed = notices(&pool, "class_changed").await;
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0]["recipient"], "ada@example.com");
    assert_eq!(changed[0]["notice"]["class_date"], "01/10/2024");
    assert_eq!(changed[0]["notice"]["changed_by"], "Ada Lovelace");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn permanent_reschedule_moves_rest_of_series_weekly(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 4).await;
    let app = common::build_test_app(pool.clone());

    let body = json!({
        "permanently": true,
        "effective_date": "2024-01-15",
        "class_date": "2024-01-16",
        "start_time": "14:00",
        "end_time": "15:00"
    });
    let response =
        put_json_auth(app, &rollout_uri(rollouts[0].id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let occurrences = json["data"]["occurrences"].as_array().unwrap();
    let dates: Vec<&str> = occurrences
        .iter()
        .map(|o| o["class_date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2024-01-16", "2024-01-23"]);
    assert_eq!(occurrences[0]["id"], rollouts[2].id);
    assert_eq!(occurrences[1]["id"], rollouts[3].id);

    for earlier in &rollouts[..2] {
        let row = ClassRolloutRepo::find_by_id(&pool, earlier.id).await.unwrap().unwrap();
        assert_eq!(row.start_time, t(10, 0));
        assert_eq!(log_count(&pool, earlier.id).await, 0);
    }
    for later in &rollouts[2..] {
        let row = ClassRolloutRepo::find_by_id(&pool, later.id).await.unwrap().unwrap();
        assert_eq!(row.start_time, t(14, 0));
        assert_eq!(row.status_id, ClassStatus::Modified.id());
        assert_eq!(log_count(&pool, later.id).await, 1);
    }

    let changed = notices(&pool, "class_changed").await;
    assert_eq!(changed[0]["notice"]["affected_count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn permanent_time_change_keeps_later_dates(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 4).await;
    let app = common::build_test_app(pool.clone());

    // Addressed from the first class, effective from the third, no new date.
    let body = json!({
        "permanently": true,
        "effective_date": "2024-01-15",
        "start_time": "14:00",
        "end_time": "15:00"
    });
    let response =
        put_json_auth(app, &rollout_uri(rollouts[0].id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "updated");

    let expected = [
        (d(2024, 1, 1), t(10, 0)),
        (d(2024, 1, 8), t(10, 0)),
        (d(2024, 1, 15), t(14, 0)),
        (d(2024, 1, 22), t(14, 0)),
    ];
    for (rollout, (date, start)) in rollouts.iter().zip(expected) {
        let row = ClassRolloutRepo::find_by_id(&pool, rollout.id).await.unwrap().unwrap();
        assert_eq!((row.class_date, row.start_time), (date, start));
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_to_missing_room_is_rejected(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    let body = json!({"room": 999_999});
    let response = put_json_auth(app, &rollout_uri(rollout.id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Room with id 999999"));

    let row = ClassRolloutRepo::find_by_id(&pool, rollout.id).await.unwrap().unwrap();
    assert_eq!(row.room_id, world.room_id);
    assert_eq!(log_count(&pool, rollout.id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_unknown_rollout_is_404(pool: PgPool) {
    let world = seed_world(&pool).await;
    let app = common::build_test_app(pool);

    let response =
        put_json_auth(app, &rollout_uri(999_999), json!({}), &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logs_list_snapshots_newest_first(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    put_json_auth(
        app.clone(),
        &rollout_uri(rollout.id),
        json!({"start_time": "12:00", "end_time": "13:00"}),
        &world.teacher_token,
    )
    .await;
    put_json_auth(
        app.clone(),
        &rollout_uri(rollout.id),
        json!({"start_time": "14:00", "end_time": "15:00"}),
        &world.teacher_token,
    )
    .await;

    let response = get_auth(
        app.clone(),
        &format!("{}/logs", rollout_uri(rollout.id)),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let logs = json["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    // Snapshots hold the values from before each change.
    assert_eq!(logs[0]["start_time"], "12:00:00");
    assert_eq!(logs[1]["start_time"], "10:00:00");
    assert_eq!(logs[0]["modified_by"], world.teacher_id);

    let missing = get_auth(app, "/api/v1/class-rollouts/999999/logs", &world.teacher_token).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Request resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn several_student_flags_are_rejected_without_mutation(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let s = student(&pool, "Sam").await;
    let enrollment = enroll(&pool, s, rollout.id).await;
    let app = common::build_test_app(pool.clone());

    let body = json!({"cancel_flag_student": true, "break_flag": true, "student_id": s});
    let response = put_json_auth(app, &rollout_uri(rollout.id), body, &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, EnrollmentStatus::Scheduled.id());
    assert!(EnrollmentLogRepo::list_for_enrollment(&pool, enrollment.id)
        .await
        .unwrap()
        .is_empty());
    assert!(OutboxRepo::list_all(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Student cancellation and revert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_then_revert_student(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let s = student(&pool, "Sam").await;
    let enrollment = enroll(&pool, s, rollout.id).await;
    let app = common::build_test_app(pool.clone());

    let response = put_json_auth(
        app.clone(),
        &rollout_uri(rollout.id),
        json!({"cancel_flag_student": true, "student_id": s}),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["operation"], "cancel_student");

    let cancelled = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status_id, EnrollmentStatus::Cancelled.id());
    assert_eq!(cancelled.current_occurrence_id, None);
    assert_eq!(cancelled.previous_occurrence_id, Some(rollout.id));

    let parent_upserts: Vec<_> = outbox(&pool, "upsert_calendar_event")
        .await
        .into_iter()
        .filter(|p| p["calendar_id"] == "cal-parents")
        .collect();
    assert_eq!(parent_upserts.len(), 1);
    assert_eq!(parent_upserts[0]["name"], "Sam: Piano");

    put_json_auth(
        app,
        &rollout_uri(rollout.id),
        json!({"revert_flag_student": true, "student_id": s}),
        &world.teacher_token,
    )
    .await;

    let reverted = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
    assert_eq!(reverted.status_id, EnrollmentStatus::Scheduled.id());
    assert_eq!(reverted.current_occurrence_id, Some(rollout.id));
    assert_eq!(reverted.previous_occurrence_id, None);

    let history = EnrollmentLogRepo::list_for_enrollment(&pool, enrollment.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status_id, EnrollmentStatus::Cancelled.id());
    assert_eq!(history[1].status_id, EnrollmentStatus::Scheduled.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_absent_student_is_a_no_op(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let s = student(&pool, "Sam").await;
    let app = common::build_test_app(pool.clone());

    let response = put_json_auth(
        app,
        &rollout_uri(rollout.id),
        json!({"cancel_flag_student": true, "student_id": s}),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["outcome"], "updated");
    assert!(json["data"]["occurrences"].as_array().unwrap().is_empty());
    assert!(OutboxRepo::list_all(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn revert_over_capacity_warns_acting_staff(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let mut students = Vec::new();
    for name in ["Sam", "Kim", "Lee"] {
        let s = student(&pool, name).await;
        enroll(&pool, s, rollout.id).await;
        students.push(s);
    }
    let app = common::build_test_app(pool.clone());
    let uri = rollout_uri(rollout.id);

    put_json_auth(
        app.clone(),
        &uri,
        json!({"cancel_flag_student": true, "student_id": students[2]}),
        &world.manager_token,
    )
    .await;
    // Capacity is 2; re-adding the third student exceeds it.
    put_json_auth(
        app,
        &uri,
        json!({"revert_flag_student": true, "student_id": students[2]}),
        &world.manager_token,
    )
    .await;

    let warnings = notices(&pool, "capacity_exceeded").await;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["recipient"], "grace@example.com");
    let class = &warnings[0]["notice"]["classes"][0];
    assert_eq!(class["class_date"], "01/10/2024");
    assert_eq!(class["location"], "Downtown");
    assert_eq!(class["duration"], "60m");
    assert_eq!(class["subject"], "Piano");
    assert_eq!(class["teacher"], "Ada Lovelace");
    assert_eq!(class["enrolled"], 3);
    assert_eq!(class["capacity"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn revert_to_exact_capacity_does_not_warn(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let sam = student(&pool, "Sam").await;
    let kim = student(&pool, "Kim").await;
    enroll(&pool, sam, rollout.id).await;
    enroll(&pool, kim, rollout.id).await;
    let app = common::build_test_app(pool.clone());
    let uri = rollout_uri(rollout.id);

    put_json_auth(
        app.clone(),
        &uri,
        json!({"cancel_flag_student": true, "student_id": kim}),
        &world.manager_token,
    )
    .await;
    put_json_auth(
        app,
        &uri,
        json!({"revert_flag_student": true, "student_id": kim}),
        &world.manager_token,
    )
    .await;

    assert!(notices(&pool, "capacity_exceeded").await.is_empty());
}

// ---------------------------------------------------------------------------
// Break, restore, discontinuation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn break_then_restore_round_trips(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 4).await;
    let s = student(&pool, "Sam").await;
    let mut enrollments = Vec::new();
    for rollout in &rollouts {
        enrollments.push(enroll(&pool, s, rollout.id).await);
    }
    let app = common::build_test_app(pool.clone());
    let uri = rollout_uri(rollouts[0].id);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({
            "break_flag": true,
            "student_id": s,
            "start_date": "2024-01-08",
            "end_date": "2024-01-15",
            "reason": "Travel"
        }),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["enrollments"].as_array().unwrap().len(), 2);

    for enrollment in &enrollments[1..3] {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, EnrollmentStatus::Break.id());
        assert_eq!(row.comments, "Travel");
        assert_eq!(row.status_comments, "on break till Jan 15, 2024");
        assert_eq!(row.current_occurrence_id, None);
    }
    for enrollment in [&enrollments[0], &enrollments[3]] {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, EnrollmentStatus::Scheduled.id());
    }

    put_json_auth(
        app,
        &uri,
        json!({
            "restore_in_class_flag": true,
            "student_id": s,
            "start_date": "2024-01-08",
            "end_date": "2024-01-15"
        }),
        &world.teacher_token,
    )
    .await;

    for (enrollment, rollout) in enrollments.iter().zip(&rollouts) {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, EnrollmentStatus::Scheduled.id());
        assert_eq!(row.current_occurrence_id, Some(rollout.id));
        assert_eq!(row.previous_occurrence_id, None);
        assert_eq!(row.comments, "");
        assert_eq!(row.status_comments, "");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn partial_restore_shortens_remaining_break(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 4).await;
    let s = student(&pool, "Sam").await;
    let mut enrollments = Vec::new();
    for rollout in &rollouts {
        enrollments.push(enroll(&pool, s, rollout.id).await);
    }
    let app = common::build_test_app(pool.clone());
    let uri = rollout_uri(rollouts[0].id);

    put_json_auth(
        app.clone(),
        &uri,
        json!({
            "break_flag": true,
            "student_id": s,
            "start_date": "2024-01-08",
            "end_date": "2024-01-22"
        }),
        &world.teacher_token,
    )
    .await;
    put_json_auth(
        app,
        &uri,
        json!({
            "restore_in_class_flag": true,
            "student_id": s,
            "start_date": "2024-01-22",
            "end_date": "2024-01-22"
        }),
        &world.teacher_token,
    )
    .await;

    for enrollment in &enrollments[1..3] {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, EnrollmentStatus::Break.id());
        assert_eq!(row.status_comments, "on break till Jan 15, 2024");
    }
    let restored = EnrollmentRepo::find_by_id(&pool, enrollments[3].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.status_id, EnrollmentStatus::Scheduled.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn partial_restore_leaves_other_series_break_alone(pool: PgPool) {
    let world = seed_world(&pool).await;
    let piano = world.series(&pool, "Piano").await;
    let violin = world.series(&pool, "Violin").await;
    let piano_rollouts = world.weekly(&pool, piano, d(2024, 1, 1), 4).await;
    let violin_rollouts = world.weekly(&pool, violin, d(2024, 1, 2), 4).await;
    let s = student(&pool, "Sam").await;
    let mut piano_enrollments = Vec::new();
    for rollout in &piano_rollouts {
        piano_enrollments.push(enroll(&pool, s, rollout.id).await);
    }
    let mut violin_enrollments = Vec::new();
    for rollout in &violin_rollouts {
        violin_enrollments.push(enroll(&pool, s, rollout.id).await);
    }
    let app = common::build_test_app(pool.clone());

    // One holiday, same end date in both series.
    for rollout in [&piano_rollouts[0], &violin_rollouts[0]] {
        let response = put_json_auth(
            app.clone(),
            &rollout_uri(rollout.id),
            json!({
                "break_flag": true,
                "student_id": s,
                "start_date": "2024-01-01",
                "end_date": "2024-01-31"
            }),
            &world.teacher_token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = put_json_auth(
        app,
        &rollout_uri(piano_rollouts[0].id),
        json!({
            "restore_in_class_flag": true,
            "student_id": s,
            "start_date": "2024-01-22",
            "end_date": "2024-01-22"
        }),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    for enrollment in &piano_enrollments[..3] {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_comments, "on break till Jan 15, 2024");
    }
    for enrollment in &violin_enrollments {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, EnrollmentStatus::Break.id());
        assert_eq!(row.status_comments, "on break till Jan 31, 2024");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn discontinuation_affects_only_later_classes(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    // Weekly from 2024-01-01: Jan 1, 8, 15, 22, 29, Feb 5, 12, 19.
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 8).await;
    let s = student(&pool, "Sam").await;
    let mut enrollments = Vec::new();
    for rollout in &rollouts {
        enrollments.push(enroll(&pool, s, rollout.id).await);
    }
    let app = common::build_test_app(pool.clone());

    let response = put_json_auth(
        app,
        &rollout_uri(rollouts[0].id),
        json!({
            "discontinuation_flag": true,
            "student_id": s,
            "date": "2024-02-01",
            "reason": "Moved away"
        }),
        &world.teacher_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["occurrences"].as_array().unwrap().len(), 3);

    for (enrollment, rollout) in enrollments.iter().zip(&rollouts) {
        let row = EnrollmentRepo::find_by_id(&pool, enrollment.id).await.unwrap().unwrap();
        if rollout.class_date >= d(2024, 2, 1) {
            assert_eq!(row.status_id, EnrollmentStatus::Discontinued.id());
            assert_eq!(row.previous_occurrence_id, Some(rollout.id));
            assert_eq!(row.current_occurrence_id, None);
            assert_eq!(row.comments, "Moved away");
        } else {
            assert_eq!(row.status_id, EnrollmentStatus::Scheduled.id());
            assert_eq!(row.current_occurrence_id, Some(rollout.id));
        }
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn teacher_cannot_delete(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    let response = delete_auth(app, &rollout_uri(rollout.id), &world.teacher_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let row = ClassRolloutRepo::find_by_id(&pool, rollout.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, ClassStatus::Scheduled.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_without_body_cancels_one_rollout(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 2).await;
    let app = common::build_test_app(pool.clone());

    let response = delete_auth(app, &rollout_uri(rollouts[0].id), &world.manager_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cancelled = ClassRolloutRepo::find_by_id(&pool, rollouts[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_matches!(cancelled.status(), Ok(ClassStatus::Cancelled));
    assert!(cancelled.show_while_cancelled);
    let untouched = ClassRolloutRepo::find_by_id(&pool, rollouts[1].id)
        .await
        .unwrap()
        .unwrap();
    assert_matches!(untouched.status(), Ok(ClassStatus::Scheduled));

    let deleted = notices(&pool, "class_deleted").await;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["notice"]["permanently"], false);
    assert_eq!(deleted[0]["notice"]["reason"], serde_json::Value::Null);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn permanent_delete_cancels_rest_of_series_in_order(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollouts = world.weekly(&pool, series, d(2024, 1, 1), 4).await;
    let s = student(&pool, "Sam").await;
    let first = enroll(&pool, s, rollouts[0].id).await;
    let later = enroll(&pool, s, rollouts[2].id).await;
    let app = common::build_test_app(pool.clone());

    let response = delete_json_auth(
        app,
        &rollout_uri(rollouts[1].id),
        json!({"permanently": true, "reason": "Teacher leaving"}),
        &world.manager_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let dates: Vec<&str> = json["data"]["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["class_date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2024-01-08", "2024-01-15", "2024-01-22"]);

    let kept = ClassRolloutRepo::find_by_id(&pool, rollouts[0].id).await.unwrap().unwrap();
    assert_eq!(kept.status_id, ClassStatus::Scheduled.id());
    assert_eq!(log_count(&pool, rollouts[0].id).await, 0);
    for rollout in &rollouts[1..] {
        let row = ClassRolloutRepo::find_by_id(&pool, rollout.id).await.unwrap().unwrap();
        assert_eq!(row.status_id, ClassStatus::Cancelled.id());
        assert_eq!(row.comments, "Teacher leaving");
        assert!(!row.show_while_cancelled);
        assert_eq!(log_count(&pool, rollout.id).await, 1);
    }

    let first_row = EnrollmentRepo::find_by_id(&pool, first.id).await.unwrap().unwrap();
    assert_eq!(first_row.status_id, EnrollmentStatus::Scheduled.id());
    let later_row = EnrollmentRepo::find_by_id(&pool, later.id).await.unwrap().unwrap();
    assert_eq!(later_row.status_id, EnrollmentStatus::Cancelled.id());
    assert_eq!(later_row.previous_occurrence_id, Some(rollouts[2].id));

    assert_eq!(outbox(&pool, "delete_calendar_event").await.len(), 3);
    let deleted = notices(&pool, "class_deleted").await;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["recipient"], "ada@example.com");
    assert_eq!(deleted[0]["notice"]["class_date"], "01/08/2024");
    assert_eq!(deleted[0]["notice"]["cancelled_count"], 3);
    assert_eq!(deleted[0]["notice"]["reason"], "Teacher leaving");
    assert_eq!(deleted[0]["notice"]["changed_by"], "Grace Hopper");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_delete_body_is_rejected(pool: PgPool) {
    let world = seed_world(&pool).await;
    let series = world.series(&pool, "Piano").await;
    let rollout = world
        .rollout(&pool, series, d(2024, 1, 10), t(10, 0), t(11, 0))
        .await;
    let app = common::build_test_app(pool.clone());

    let response = delete_json_auth(
        app,
        &rollout_uri(rollout.id),
        json!({"permanently": "yes"}),
        &world.manager_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let row = ClassRolloutRepo::find_by_id(&pool, rollout.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, ClassStatus::Scheduled.id());
}
