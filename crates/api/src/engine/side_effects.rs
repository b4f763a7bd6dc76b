//! Outbox messages produced by rollout mutations.
//!
//! Everything here runs inside the mutation's transaction, so a message is
//! queued if and only if the change it describes commits.

use rollout_core::error::CoreError;
use rollout_core::outbox::{
    notice_date, CalendarEvent, CapacityInfo, Notice, Notification, OutboxMessage,
};
use rollout_core::request::DeleteRolloutRequest;
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::ClassRolloutDetail;
use rollout_db::models::enrollment::EnrollmentDetail;
use rollout_db::repositories::{ClassRolloutRepo, EnrollmentRepo, OutboxRepo};
use sqlx::PgConnection;

use super::{occurrence_ids, Actor, Affected};
use crate::error::AppResult;

/// Queue calendar deletes for the cancelled rollouts and one deletion notice
/// to the addressed rollout's teacher.
pub async fn enqueue_deletion(
    conn: &mut PgConnection,
    occurrence_id: DbId,
    cancelled_ids: &[DbId],
    request: &DeleteRolloutRequest,
    actor: &Actor,
) -> AppResult<()> {
    let details = ClassRolloutRepo::list_details(&mut *conn, cancelled_ids).await?;
    for detail in &details {
        if let (Some(event_id), Some(calendar_id)) =
            (&detail.rollout.gc_event_id, &detail.calendar_id)
        {
            OutboxRepo::enqueue(
                &mut *conn,
                &OutboxMessage::DeleteCalendarEvent {
                    calendar_id: calendar_id.clone(),
                    event_id: event_id.clone(),
                },
            )
            .await?;
        }
    }

    let addressed = find_detail(&mut *conn, occurrence_id).await?;
    let notice = Notice::ClassDeleted {
        class_date: notice_date(addressed.rollout.class_date),
        subject: addressed.subject_name.clone(),
        location: addressed.location_short_name.clone(),
        reason: request.reason.clone().filter(|r| !r.is_empty()),
        permanently: request.permanently,
        cancelled_count: cancelled_ids.len(),
        changed_by: actor.name.clone(),
    };
    notify(conn, &addressed.teacher_email, notice).await
}

/// Queue calendar upserts for everything an update touched and one change
/// notice to the addressed rollout's teacher.
pub async fn enqueue_update(
    conn: &mut PgConnection,
    occurrence_id: DbId,
    affected: &Affected,
    actor: &Actor,
) -> AppResult<()> {
    let details =
        ClassRolloutRepo::list_details(&mut *conn, &occurrence_ids(&affected.occurrences)).await?;
    for event in details.iter().filter_map(occurrence_event) {
        OutboxRepo::enqueue(&mut *conn, &OutboxMessage::UpsertCalendarEvent(event)).await?;
    }

    let enrollment_ids: Vec<DbId> = affected.enrollments.iter().map(|e| e.id).collect();
    let enrollment_details = EnrollmentRepo::list_details(&mut *conn, &enrollment_ids).await?;
    for event in enrollment_details.iter().filter_map(enrollment_event) {
        OutboxRepo::enqueue(&mut *conn, &OutboxMessage::UpsertCalendarEvent(event)).await?;
    }

    let addressed = find_detail(&mut *conn, occurrence_id).await?;
    let notice = Notice::ClassChanged {
        class_date: notice_date(addressed.rollout.class_date),
        subject: addressed.subject_name.clone(),
        location: addressed.location_short_name.clone(),
        affected_count: affected.occurrences.len(),
        changed_by: actor.name.clone(),
    };
    notify(conn, &addressed.teacher_email, notice).await
}

/// Queue a capacity warning to the acting staff member.
pub async fn enqueue_capacity_warning(
    conn: &mut PgConnection,
    detail: &ClassRolloutDetail,
    enrolled: i64,
    actor: &Actor,
) -> AppResult<()> {
    let notice = Notice::CapacityExceeded {
        classes: vec![CapacityInfo {
            class_date: notice_date(detail.rollout.class_date),
            location: detail.location_short_name.clone(),
            duration: detail.duration_short_name.clone(),
            subject: detail.subject_name.clone(),
            teacher: detail.teacher_name.clone(),
            enrolled,
            capacity: detail.rollout.max_capacity,
        }],
        changed_by: actor.name.clone(),
    };
    notify(conn, &actor.email, notice).await
}

async fn notify(conn: &mut PgConnection, recipient: &str, notice: Notice) -> AppResult<()> {
    OutboxRepo::enqueue(
        conn,
        &OutboxMessage::SendNotification(Notification {
            recipient: recipient.to_string(),
            notice,
        }),
    )
    .await?;
    Ok(())
}

async fn find_detail(conn: &mut PgConnection, id: DbId) -> AppResult<ClassRolloutDetail> {
    let detail = ClassRolloutRepo::find_detail(conn, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ClassRollout",
            id,
        })?;
    Ok(detail)
}

/// The teacher-facing event of a rollout, if it is synced to a calendar.
fn occurrence_event(detail: &ClassRolloutDetail) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        event_id: detail.rollout.gc_event_id.clone()?,
        calendar_id: detail.calendar_id.clone()?,
        name: detail.calendar_title(),
        description: detail.calendar_description(),
        attendees: vec![detail.teacher_email.clone()],
        date: detail.rollout.class_date,
        start_time: detail.rollout.start_time,
        end_time: detail.rollout.end_time,
    })
}

/// The parent-facing event of an enrollment, if it has one.
fn enrollment_event(detail: &EnrollmentDetail) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        event_id: detail.gc_parent_event_id.clone()?,
        calendar_id: detail.parent_calendar_id.clone()?,
        name: detail.calendar_title(),
        description: detail.calendar_description(),
        attendees: Vec::new(),
        date: detail.class_date,
        start_time: detail.start_time,
        end_time: detail.end_time,
    })
}
