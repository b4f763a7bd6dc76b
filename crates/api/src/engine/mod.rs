//! Rollout mutation engine.
//!
//! [`RolloutMutationEngine`] applies every change to a class rollout and its
//! enrollments. Each call runs in one transaction that locks the addressed
//! rollout, writes the audit rows and the mutation, and enqueues the outbound
//! side effects into `sync_outbox`. After commit the outbox dispatcher is
//! woken; remote calls never happen on the request path.

pub mod enrollment_range;
pub mod reschedule;
pub mod side_effects;
pub mod student;

use std::sync::Arc;

use rollout_core::conflict::ConflictReport;
use rollout_core::error::CoreError;
use rollout_core::request::{DeleteRolloutRequest, RequestedOperation, RolloutUpdateRequest};
use rollout_core::status::EnrollmentStatus;
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::ClassRollout;
use rollout_db::models::enrollment::Enrollment;
use rollout_db::repositories::{
    ClassRolloutLogRepo, ClassRolloutRepo, EnrollmentLogRepo, EnrollmentRepo, ReferenceRepo,
};
use rollout_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;
use tokio::sync::Notify;

use crate::error::AppResult;
use crate::state::AppState;

use self::reschedule::RescheduleResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The staff member performing a mutation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub staff_id: DbId,
    pub name: String,
    pub email: String,
}

/// Rollouts and enrollments touched by one operation.
#[derive(Debug, Default)]
pub struct Affected {
    pub occurrences: Vec<ClassRollout>,
    pub enrollments: Vec<Enrollment>,
}

impl Affected {
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty() && self.enrollments.is_empty()
    }

    fn into_change(self, operation: &'static str) -> RolloutChange {
        RolloutChange {
            operation,
            occurrences: self.occurrences,
            enrollments: self.enrollments,
        }
    }
}

/// Result of an applied mutation, as returned to the caller.
#[derive(Debug, Serialize)]
pub struct RolloutChange {
    pub operation: &'static str,
    pub occurrences: Vec<ClassRollout>,
    pub enrollments: Vec<Enrollment>,
}

/// Result of an update request.
///
/// A teacher double-booking is not an error: the reschedule is refused and
/// the conflicting class is reported instead.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated(RolloutChange),
    Blocked { conflict: ConflictReport },
}

/// How an enrollment moves.
#[derive(Debug, Clone, Copy)]
pub enum Transition {
    /// Out of class with the given status.
    Leave(EnrollmentStatus),
    /// Back into the occurrence it left.
    Rejoin,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RolloutMutationEngine {
    pool: DbPool,
    outbox_signal: Arc<Notify>,
}

impl RolloutMutationEngine {
    pub fn new(pool: DbPool, outbox_signal: Arc<Notify>) -> Self {
        Self {
            pool,
            outbox_signal,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.pool.clone(), Arc::clone(&state.outbox_signal))
    }

    /// Cancel a rollout, or the rollout and every later one in its series.
    ///
    /// Students attending a cancelled rollout are moved out with status
    /// `cancelled` so a later revert can put them back.
    pub async fn delete(
        &self,
        occurrence_id: DbId,
        request: DeleteRolloutRequest,
        actor_id: DbId,
    ) -> AppResult<RolloutChange> {
        request.check()?;

        let mut tx = self.pool.begin().await?;
        let actor = load_actor(&mut *tx, actor_id).await?;
        let occurrence = lock_occurrence(&mut *tx, occurrence_id).await?;

        let targets = if request.permanently {
            ClassRolloutRepo::list_series_from(&mut *tx, occurrence.series_id, occurrence.class_date)
                .await?
        } else {
            vec![occurrence.clone()]
        };

        let reason = request.reason.as_deref().unwrap_or_default();
        let mut affected = Affected::default();
        for target in &targets {
            ClassRolloutLogRepo::snapshot(&mut *tx, target.id, actor.staff_id).await?;
            let cancelled =
                ClassRolloutRepo::cancel(&mut *tx, target.id, reason, !request.permanently).await?;
            affected.occurrences.push(cancelled);
        }

        let target_ids: Vec<DbId> = targets.iter().map(|t| t.id).collect();
        let attending = EnrollmentRepo::list_attending_in(&mut *tx, &target_ids, None).await?;
        for enrollment in &attending {
            let moved = transition_enrollment(
                &mut *tx,
                enrollment,
                actor.staff_id,
                Transition::Leave(EnrollmentStatus::Cancelled),
                None,
                None,
            )
            .await?;
            affected.enrollments.push(moved);
        }

        side_effects::enqueue_deletion(&mut *tx, occurrence.id, &target_ids, &request, &actor)
            .await?;
        tx.commit().await?;
        self.outbox_signal.notify_one();

        tracing::info!(
            occurrence_id,
            permanently = request.permanently,
            cancelled = affected.occurrences.len(),
            enrollments = affected.enrollments.len(),
            actor_id,
            "Class rollout deleted"
        );
        Ok(affected.into_change("delete"))
    }

    /// Apply an update request to a rollout.
    ///
    /// The request is resolved into exactly one operation first; a request
    /// that names several student actions is rejected before anything is
    /// read or written.
    pub async fn update(
        &self,
        occurrence_id: DbId,
        request: RolloutUpdateRequest,
        actor_id: DbId,
    ) -> AppResult<UpdateOutcome> {
        let operation = request.resolve()?;
        let name = operation.name();

        let mut tx = self.pool.begin().await?;
        let actor = load_actor(&mut *tx, actor_id).await?;
        let occurrence = lock_occurrence(&mut *tx, occurrence_id).await?;

        let affected = match operation {
            RequestedOperation::CancelStudent { student_id } => {
                student::cancel(&mut *tx, &occurrence, student_id, &actor).await?
            }
            RequestedOperation::RevertStudent { student_id } => {
                student::revert(&mut *tx, &occurrence, student_id, &actor).await?
            }
            RequestedOperation::RestoreFromBreak { student_id, range } => {
                enrollment_range::restore(&mut *tx, &occurrence, student_id, range, &actor).await?
            }
            RequestedOperation::PlaceOnBreak {
                student_id,
                range,
                reason,
            } => {
                enrollment_range::place_on_break(
                    &mut *tx,
                    &occurrence,
                    student_id,
                    range,
                    &reason,
                    &actor,
                )
                .await?
            }
            RequestedOperation::Discontinue {
                student_id,
                effective_date,
                reason,
            } => {
                enrollment_range::discontinue(
                    &mut *tx,
                    &occurrence,
                    student_id,
                    effective_date,
                    &reason,
                    &actor,
                )
                .await?
            }
            RequestedOperation::Reschedule(reschedule) => {
                match reschedule::reschedule(&mut *tx, &occurrence, &reschedule, &actor).await? {
                    RescheduleResult::Applied(occurrences) => Affected {
                        occurrences,
                        enrollments: Vec::new(),
                    },
                    RescheduleResult::Blocked(conflict) => {
                        tx.rollback().await?;
                        tracing::info!(
                            occurrence_id,
                            conflicts = conflict.count,
                            conflicting_date = %conflict.class.date,
                            "Reschedule blocked by teacher conflict"
                        );
                        return Ok(UpdateOutcome::Blocked { conflict });
                    }
                }
            }
        };

        if !affected.is_empty() {
            side_effects::enqueue_update(&mut *tx, occurrence.id, &affected, &actor).await?;
        }
        tx.commit().await?;
        if !affected.is_empty() {
            self.outbox_signal.notify_one();
        }

        tracing::info!(
            occurrence_id,
            operation = name,
            occurrences = affected.occurrences.len(),
            enrollments = affected.enrollments.len(),
            actor_id,
            "Class rollout updated"
        );
        Ok(UpdateOutcome::Updated(affected.into_change(name)))
    }
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

/// Resolve the acting staff member. A token for unknown staff is rejected.
async fn load_actor(conn: &mut PgConnection, staff_id: DbId) -> AppResult<Actor> {
    let staff = ReferenceRepo::find_staff(conn, staff_id)
        .await?
        .ok_or_else(|| CoreError::Unauthorized(format!("Unknown staff member {staff_id}")))?;
    Ok(Actor {
        staff_id: staff.id,
        name: staff.full_name,
        email: staff.email,
    })
}

/// Lock the rollout's series, then the rollout row itself.
async fn lock_occurrence(conn: &mut PgConnection, id: DbId) -> AppResult<ClassRollout> {
    let not_found = CoreError::NotFound {
        entity: "ClassRollout",
        id,
    };
    if ClassRolloutRepo::lock_series_of(&mut *conn, id).await?.is_none() {
        return Err(not_found.into());
    }
    let occurrence = ClassRolloutRepo::lock_by_id(conn, id)
        .await?
        .ok_or(not_found)?;
    Ok(occurrence)
}

/// Move one enrollment and write its audit row.
///
/// `comments` and `status_comments` replace the stored values when `Some`.
pub(crate) async fn transition_enrollment(
    conn: &mut PgConnection,
    enrollment: &Enrollment,
    actor_id: DbId,
    transition: Transition,
    comments: Option<&str>,
    status_comments: Option<&str>,
) -> AppResult<Enrollment> {
    let from = enrollment.placement()?;
    let to = match transition {
        Transition::Leave(status) => from.leave(status)?,
        Transition::Rejoin => from.rejoin()?,
    };

    let updated =
        EnrollmentRepo::apply_placement(&mut *conn, enrollment.id, &to, comments, status_comments)
            .await?;
    EnrollmentLogRepo::record(&mut *conn, enrollment.id, actor_id, from.status(), &to).await?;
    Ok(updated)
}

fn occurrence_ids(occurrences: &[ClassRollout]) -> Vec<DbId> {
    occurrences.iter().map(|o| o.id).collect()
}
