//! Moves that span several rollouts of a series for one student: break,
//! restore from break, and discontinuation.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rollout_core::recurrence::{break_note, DateRange};
use rollout_core::status::EnrollmentStatus;
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::ClassRollout;
use rollout_db::models::enrollment::Enrollment;
use rollout_db::repositories::{ClassRolloutRepo, EnrollmentRepo};
use sqlx::PgConnection;

use super::{occurrence_ids, transition_enrollment, Actor, Affected, Transition};
use crate::error::AppResult;

/// Put a student on break for every rollout of the series inside `range`.
pub async fn place_on_break(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    student_id: DbId,
    range: DateRange,
    reason: &str,
    actor: &Actor,
) -> AppResult<Affected> {
    let occurrences =
        ClassRolloutRepo::list_series_between(&mut *conn, occurrence.series_id, range).await?;
    let note = break_note(range.end());

    let enrollments = leave_all(
        conn,
        &occurrences,
        student_id,
        EnrollmentStatus::Break,
        reason,
        Some(&note),
        actor,
    )
    .await?;

    tracing::debug!(
        series_id = occurrence.series_id,
        student_id,
        count = enrollments.len(),
        %note,
        "Student placed on break"
    );
    Ok(Affected {
        occurrences,
        enrollments,
    })
}

/// Discontinue a student from every rollout of the series on or after
/// `effective_date`.
pub async fn discontinue(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    student_id: DbId,
    effective_date: NaiveDate,
    reason: &str,
    actor: &Actor,
) -> AppResult<Affected> {
    let occurrences =
        ClassRolloutRepo::list_series_from(&mut *conn, occurrence.series_id, effective_date)
            .await?;

    let enrollments = leave_all(
        conn,
        &occurrences,
        student_id,
        EnrollmentStatus::Discontinued,
        reason,
        None,
        actor,
    )
    .await?;

    Ok(Affected {
        occurrences,
        enrollments,
    })
}

/// Bring a student back into every rollout of the series inside `range`
/// they were moved out of by a break or a discontinuation.
///
/// Break enrollments of the same break in this series that stay outside
/// `range` get their note rewritten to end at the last class still on break.
pub async fn restore(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    student_id: DbId,
    range: DateRange,
    actor: &Actor,
) -> AppResult<Affected> {
    let occurrences =
        ClassRolloutRepo::list_series_between(&mut *conn, occurrence.series_id, range).await?;
    let targets = EnrollmentRepo::list_away_in(
        &mut *conn,
        &occurrence_ids(&occurrences),
        student_id,
        &EnrollmentStatus::restorable_ids(),
    )
    .await?;

    let notes: BTreeSet<&str> = targets
        .iter()
        .filter(|e| e.status_id == EnrollmentStatus::Break.id() && !e.status_comments.is_empty())
        .map(|e| e.status_comments.as_str())
        .collect();

    for note in notes {
        let chain = EnrollmentRepo::list_break_chain(
            &mut *conn,
            student_id,
            occurrence.series_id,
            note,
            range,
        )
        .await?;
        let Some(last) = chain.last() else {
            continue;
        };
        let rewritten = break_note(last.previous_class_date);
        let chain_ids: Vec<DbId> = chain.iter().map(|link| link.id).collect();
        EnrollmentRepo::set_status_comments(&mut *conn, &chain_ids, &rewritten).await?;
        tracing::debug!(student_id, from = note, to = %rewritten, links = chain_ids.len(), "Break note rewritten");
    }

    let mut enrollments = Vec::with_capacity(targets.len());
    for enrollment in &targets {
        let moved = transition_enrollment(
            &mut *conn,
            enrollment,
            actor.staff_id,
            Transition::Rejoin,
            Some(""),
            Some(""),
        )
        .await?;
        enrollments.push(moved);
    }

    Ok(Affected {
        occurrences,
        enrollments,
    })
}

/// Move the student's attending enrollments on `occurrences` out with `status`.
async fn leave_all(
    conn: &mut PgConnection,
    occurrences: &[ClassRollout],
    student_id: DbId,
    status: EnrollmentStatus,
    reason: &str,
    status_comments: Option<&str>,
    actor: &Actor,
) -> AppResult<Vec<Enrollment>> {
    let attending =
        EnrollmentRepo::list_attending_in(&mut *conn, &occurrence_ids(occurrences), Some(student_id))
            .await?;

    let mut moved = Vec::with_capacity(attending.len());
    for enrollment in &attending {
        moved.push(
            transition_enrollment(
                &mut *conn,
                enrollment,
                actor.staff_id,
                Transition::Leave(status),
                Some(reason),
                status_comments,
            )
            .await?,
        );
    }
    Ok(moved)
}
