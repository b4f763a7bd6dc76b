//! Single-student moves on one rollout: cancellation and revert.

use rollout_core::status::EnrollmentStatus;
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::ClassRollout;
use rollout_db::repositories::{ClassRolloutRepo, EnrollmentRepo};
use sqlx::PgConnection;

use super::{side_effects, transition_enrollment, Actor, Affected, Transition};
use crate::error::AppResult;

/// Take a student out of one rollout.
///
/// A student who is not attending the rollout is left alone and nothing is
/// reported as affected.
pub async fn cancel(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    student_id: DbId,
    actor: &Actor,
) -> AppResult<Affected> {
    let Some(enrollment) =
        EnrollmentRepo::find_attending_for_student(&mut *conn, occurrence.id, student_id).await?
    else {
        tracing::debug!(
            occurrence_id = occurrence.id,
            student_id,
            "Student not attending, nothing to cancel"
        );
        return Ok(Affected::default());
    };

    let moved = transition_enrollment(
        conn,
        &enrollment,
        actor.staff_id,
        Transition::Leave(EnrollmentStatus::Cancelled),
        None,
        None,
    )
    .await?;

    Ok(Affected {
        occurrences: vec![occurrence.clone()],
        enrollments: vec![moved],
    })
}

/// Put a student back into a rollout they were moved out of.
///
/// When the rollout is now over capacity the acting staff member gets a
/// capacity warning.
pub async fn revert(
    conn: &mut PgConnection,
    occurrence: &ClassRollout,
    student_id: DbId,
    actor: &Actor,
) -> AppResult<Affected> {
    let Some(enrollment) =
        EnrollmentRepo::find_away_for_student(&mut *conn, occurrence.id, student_id).await?
    else {
        tracing::debug!(
            occurrence_id = occurrence.id,
            student_id,
            "No enrollment left this rollout, nothing to revert"
        );
        return Ok(Affected::default());
    };

    let moved = transition_enrollment(
        &mut *conn,
        &enrollment,
        actor.staff_id,
        Transition::Rejoin,
        None,
        None,
    )
    .await?;

    let enrolled = EnrollmentRepo::count_attending(&mut *conn, occurrence.id).await?;
    if enrolled > i64::from(occurrence.max_capacity) {
        if let Some(detail) = ClassRolloutRepo::find_detail(&mut *conn, occurrence.id).await? {
            tracing::warn!(
                occurrence_id = occurrence.id,
                enrolled,
                capacity = occurrence.max_capacity,
                "Revert pushed class over capacity"
            );
            side_effects::enqueue_capacity_warning(conn, &detail, enrolled, actor).await?;
        }
    }

    Ok(Affected {
        occurrences: vec![occurrence.clone()],
        enrollments: vec![moved],
    })
}
