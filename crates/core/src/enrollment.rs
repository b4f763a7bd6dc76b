//! Enrollment placement state machine.
//!
//! A student's enrollment is either attending an occurrence or away from one.
//! Away placements always remember the occurrence they left so the move can
//! be reversed (revert after a cancellation, restore after a break or a
//! discontinuation).
//!
//! Stored columns map onto [`Placement`] as follows:
//!
//! | status         | current_occurrence_id | previous_occurrence_id |
//! |----------------|-----------------------|------------------------|
//! | `scheduled`    | set                   | NULL                   |
//! | any other      | NULL                  | set                    |

use crate::error::CoreError;
use crate::status::EnrollmentStatus;
use crate::types::DbId;

/// Where an enrollment currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// In class for `occurrence_id`.
    Attending { occurrence_id: DbId },
    /// Out of class with `status`, having left `from_occurrence_id`.
    Away {
        status: EnrollmentStatus,
        from_occurrence_id: DbId,
    },
}

impl Placement {
    /// Rebuild a placement from stored columns.
    ///
    /// Rows that violate the table invariant are reported as internal errors;
    /// the database CHECK constraint should make them impossible.
    pub fn from_columns(
        status: EnrollmentStatus,
        current_occurrence_id: Option<DbId>,
        previous_occurrence_id: Option<DbId>,
    ) -> Result<Self, CoreError> {
        match (status, current_occurrence_id, previous_occurrence_id) {
            (EnrollmentStatus::Scheduled, Some(occurrence_id), None) => {
                Ok(Placement::Attending { occurrence_id })
            }
            (status, None, Some(from_occurrence_id)) if status != EnrollmentStatus::Scheduled => {
                Ok(Placement::Away {
                    status,
                    from_occurrence_id,
                })
            }
            (status, current, previous) => Err(CoreError::Integrity(format!(
                "Enrollment in status '{status}' has inconsistent occurrences \
                 (current={current:?}, previous={previous:?})"
            ))),
        }
    }

    pub fn status(&self) -> EnrollmentStatus {
        match self {
            Placement::Attending { .. } => EnrollmentStatus::Scheduled,
            Placement::Away { status, .. } => *status,
        }
    }

    pub fn current_occurrence_id(&self) -> Option<DbId> {
        match self {
            Placement::Attending { occurrence_id } => Some(*occurrence_id),
            Placement::Away { .. } => None,
        }
    }

    pub fn previous_occurrence_id(&self) -> Option<DbId> {
        match self {
            Placement::Attending { .. } => None,
            Placement::Away {
                from_occurrence_id, ..
            } => Some(*from_occurrence_id),
        }
    }

    /// The occurrence this enrollment is tied to, whichever side it is on.
    pub fn occurrence_id(&self) -> DbId {
        match self {
            Placement::Attending { occurrence_id } => *occurrence_id,
            Placement::Away {
                from_occurrence_id, ..
            } => *from_occurrence_id,
        }
    }

    /// Take the student out of class (cancellation, break, discontinuation).
    pub fn leave(self, status: EnrollmentStatus) -> Result<Self, CoreError> {
        validate_transition(self.status(), status)?;
        match self {
            Placement::Attending { occurrence_id } => Ok(Placement::Away {
                status,
                from_occurrence_id: occurrence_id,
            }),
            Placement::Away { .. } => unreachable_transition(self.status(), status),
        }
    }

    /// Put the student back into the occurrence they left (revert, restore).
    pub fn rejoin(self) -> Result<Self, CoreError> {
        validate_transition(self.status(), EnrollmentStatus::Scheduled)?;
        match self {
            Placement::Away {
                from_occurrence_id, ..
            } => Ok(Placement::Attending {
                occurrence_id: from_occurrence_id,
            }),
            Placement::Attending { .. } => {
                unreachable_transition(self.status(), EnrollmentStatus::Scheduled)
            }
        }
    }
}

/// Valid target statuses reachable from `from`.
pub fn valid_transitions(from: EnrollmentStatus) -> &'static [EnrollmentStatus] {
    match from {
        EnrollmentStatus::Scheduled => &[
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Break,
            EnrollmentStatus::Discontinued,
        ],
        EnrollmentStatus::Cancelled | EnrollmentStatus::Break | EnrollmentStatus::Discontinued => {
            &[EnrollmentStatus::Scheduled]
        }
    }
}

pub fn can_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a state transition, returning a validation error for invalid ones.
pub fn validate_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid enrollment transition: {from} -> {to}"
        )))
    }
}

fn unreachable_transition(
    from: EnrollmentStatus,
    to: EnrollmentStatus,
) -> Result<Placement, CoreError> {
    Err(CoreError::Integrity(format!(
        "Transition table allowed {from} -> {to} for the wrong placement kind"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attending(id: DbId) -> Placement {
        Placement::Attending { occurrence_id: id }
    }

    #[test]
    fn leave_moves_current_to_previous() {
        let away = attending(10).leave(EnrollmentStatus::Break).unwrap();
        assert_eq!(away.status(), EnrollmentStatus::Break);
        assert_eq!(away.current_occurrence_id(), None);
        assert_eq!(away.previous_occurrence_id(), Some(10));
    }

    #[test]
    fn rejoin_restores_original_occurrence() {
        let back = attending(10)
            .leave(EnrollmentStatus::Cancelled)
            .unwrap()
            .rejoin()
            .unwrap();
        assert_eq!(back, attending(10));
        assert_eq!(back.previous_occurrence_id(), None);
    }

    #[test]
    fn cannot_leave_twice() {
        let away = attending(3).leave(EnrollmentStatus::Discontinued).unwrap();
        let err = away.leave(EnrollmentStatus::Break).unwrap_err();
        assert!(err.to_string().contains("discontinued -> break"));
    }

    #[test]
    fn cannot_rejoin_while_attending() {
        assert!(attending(3).rejoin().is_err());
    }

    #[test]
    fn cannot_leave_into_scheduled() {
        assert!(attending(3).leave(EnrollmentStatus::Scheduled).is_err());
    }

    #[test]
    fn from_columns_accepts_valid_rows() {
        assert_eq!(
            Placement::from_columns(EnrollmentStatus::Scheduled, Some(1), None).unwrap(),
            attending(1)
        );
        assert_eq!(
            Placement::from_columns(EnrollmentStatus::Break, None, Some(2)).unwrap(),
            Placement::Away {
                status: EnrollmentStatus::Break,
                from_occurrence_id: 2
            }
        );
    }

    #[test]
    fn from_columns_rejects_inconsistent_rows() {
        assert!(Placement::from_columns(EnrollmentStatus::Scheduled, None, Some(1)).is_err());
        assert!(Placement::from_columns(EnrollmentStatus::Cancelled, Some(1), None).is_err());
        assert!(Placement::from_columns(EnrollmentStatus::Break, Some(1), Some(2)).is_err());
        assert!(Placement::from_columns(EnrollmentStatus::Break, None, None).is_err());
    }

    #[test]
    fn every_away_status_returns_to_scheduled() {
        for status in [
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Break,
            EnrollmentStatus::Discontinued,
        ] {
            assert!(can_transition(status, EnrollmentStatus::Scheduled));
            assert!(!can_transition(status, status));
        }
    }
}
