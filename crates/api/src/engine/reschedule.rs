//! Conflict-checked reschedule of one rollout or the rest of its series.

use rollout_core::conflict::{ConflictReport, ConflictingClass};
use rollout_core::error::CoreError;
use rollout_core::recurrence::weekly_dates;
use rollout_core::request::{RescheduleRequest, ScheduleSlot};
use rollout_db::models::class_rollout::{ClassRollout, TeacherConflict};
use rollout_db::models::reference::ReferenceKind;
use rollout_db::repositories::{ClassRolloutLogRepo, ClassRolloutRepo, ReferenceRepo};
use sqlx::PgConnection;

use super::Actor;
use crate::error::AppResult;

/// What a reschedule did.
#[derive(Debug)]
pub enum RescheduleResult {
    /// Rollouts rewritten, in series order.
    Applied(Vec<ClassRollout>),
    /// Nothing was written; the teacher is already busy.
    Blocked(ConflictReport),
}

/// Move `occurrence`, or every rollout of its series from `effective_date`,
/// to a new slot.
///
/// Fields left out of the request keep the addressed rollout's values. With
/// `permanently`, target `i` lands `i` weeks after the new class date, or
/// after the first target's own date when no class date is given. The
/// new teacher's schedule is locked for the rest of the transaction before
/// the overlap check, so two concurrent reschedules cannot both pass it.
pub async fn reschedule(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    request: &RescheduleRequest,
    actor: &Actor,
) -> AppResult<RescheduleResult> {
    check_references(&mut *conn, request).await?;
    let base = request.apply_to(&occurrence.schedule_slot()?)?;

    let targets = match (request.permanently, request.effective_date) {
        (true, Some(from)) => {
            let targets =
                ClassRolloutRepo::list_series_from(&mut *conn, occurrence.series_id, from).await?;
            if targets.is_empty() {
                return Err(CoreError::Validation(format!(
                    "No classes of this series on or after {from}"
                ))
                .into());
            }
            targets
        }
        (true, None) => {
            return Err(CoreError::Validation(
                "effective_date is required when permanently is set".into(),
            )
            .into());
        }
        (false, _) => vec![occurrence.clone()],
    };
    let anchor = match (request.class_date, targets.first()) {
        (None, Some(first)) => first.class_date,
        _ => base.class_date,
    };
    let dates = weekly_dates(anchor, targets.len());

    ClassRolloutRepo::lock_teacher_schedule(&mut *conn, base.teacher_id).await?;
    let conflicts = ClassRolloutRepo::find_teacher_conflicts(
        &mut *conn,
        base.teacher_id,
        &dates,
        base.time,
        occurrence.series_id,
    )
    .await?;
    if let Some(first) = conflicts.first() {
        return Ok(RescheduleResult::Blocked(conflict_report(
            conflicts.len(),
            first,
        )));
    }

    let mut applied = Vec::with_capacity(targets.len());
    for (target, class_date) in targets.iter().zip(dates) {
        ClassRolloutLogRepo::snapshot(&mut *conn, target.id, actor.staff_id).await?;
        let slot = ScheduleSlot { class_date, ..base };
        applied.push(ClassRolloutRepo::apply_schedule(&mut *conn, target.id, &slot).await?);
    }

    tracing::debug!(
        occurrence_id = occurrence.id,
        series_id = occurrence.series_id,
        count = applied.len(),
        teacher_id = base.teacher_id,
        "Rollouts rescheduled"
    );
    Ok(RescheduleResult::Applied(applied))
}

/// Every id the request names must exist.
async fn check_references(conn: &mut PgConnection, request: &RescheduleRequest) -> AppResult<()> {
    let references = [
        (ReferenceKind::Room, request.room_id),
        (ReferenceKind::Subject, request.subject_id),
        (ReferenceKind::Teacher, request.teacher_id),
        (ReferenceKind::Duration, request.duration_id),
    ];
    for (kind, id) in references {
        let Some(id) = id else { continue };
        if !ReferenceRepo::exists(&mut *conn, kind, id).await? {
            return Err(CoreError::Validation(format!(
                "{} with id {id} does not exist",
                kind.entity()
            ))
            .into());
        }
    }
    Ok(())
}

fn conflict_report(count: usize, first: &TeacherConflict) -> ConflictReport {
    ConflictReport::new(
        i64::try_from(count).unwrap_or(i64::MAX),
        ConflictingClass {
            date: first.class_date,
            start_time: first.start_time,
            end_time: first.end_time,
            room: first.room_name.clone(),
            teacher: first.teacher_name.clone(),
            subject: first.subject_name.clone(),
        },
    )
}
