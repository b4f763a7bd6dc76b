//! Mutation requests for a class rollout.
//!
//! [`RolloutUpdateRequest`] is the raw body of an update. It is resolved once
//! into a [`RequestedOperation`] so handlers dispatch with a `match` instead
//! of probing flags.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::Validate;

use crate::error::CoreError;
use crate::recurrence::DateRange;
use crate::time_range::TimeRange;
use crate::types::DbId;

/// Maximum length of a free-text reason.
pub const MAX_REASON_LEN: u64 = 1000;

/// Upper bound accepted for `max_students`.
pub const MAX_CAPACITY: i32 = 500;

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Body of a `DELETE /class-rollouts/{id}` request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DeleteRolloutRequest {
    /// Also cancel every later occurrence of the series.
    #[serde(default)]
    pub permanently: bool,
    #[validate(length(max = MAX_REASON_LEN))]
    pub reason: Option<String>,
}

impl DeleteRolloutRequest {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Body of a `PUT /class-rollouts/{id}` request.
///
/// At most one of the five student flags may be set. With no flag set the
/// request is a reschedule; omitted reschedule fields keep their current
/// value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RolloutUpdateRequest {
    #[serde(default)]
    pub cancel_flag_student: bool,
    #[serde(default)]
    pub revert_flag_student: bool,
    #[serde(default)]
    pub restore_in_class_flag: bool,
    #[serde(default)]
    pub break_flag: bool,
    #[serde(default)]
    pub discontinuation_flag: bool,

    pub student_id: Option<DbId>,
    /// Effective date of a discontinuation.
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = MAX_REASON_LEN))]
    pub reason: Option<String>,

    #[serde(default)]
    pub permanently: bool,
    pub effective_date: Option<NaiveDate>,
    pub class_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "clock_time::deserialize_option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "clock_time::deserialize_option")]
    pub end_time: Option<NaiveTime>,
    pub room: Option<DbId>,
    pub subject: Option<DbId>,
    pub teacher: Option<DbId>,
    pub duration: Option<DbId>,
    #[validate(range(min = 0, max = MAX_CAPACITY))]
    pub max_students: Option<i32>,
}

/// A fully validated update, one variant per handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestedOperation {
    CancelStudent {
        student_id: DbId,
    },
    RevertStudent {
        student_id: DbId,
    },
    RestoreFromBreak {
        student_id: DbId,
        range: DateRange,
    },
    PlaceOnBreak {
        student_id: DbId,
        range: DateRange,
        reason: String,
    },
    Discontinue {
        student_id: DbId,
        effective_date: NaiveDate,
        reason: String,
    },
    Reschedule(RescheduleRequest),
}

impl RequestedOperation {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RequestedOperation::CancelStudent { .. } => "cancel_student",
            RequestedOperation::RevertStudent { .. } => "revert_student",
            RequestedOperation::RestoreFromBreak { .. } => "restore_from_break",
            RequestedOperation::PlaceOnBreak { .. } => "place_on_break",
            RequestedOperation::Discontinue { .. } => "discontinue",
            RequestedOperation::Reschedule(_) => "reschedule",
        }
    }
}

/// A student action an update body can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentFlag {
    Cancel,
    Revert,
    Restore,
    Break,
    Discontinue,
}

impl StudentFlag {
    /// The body field that sets this flag.
    pub fn field(self) -> &'static str {
        match self {
            StudentFlag::Cancel => "cancel_flag_student",
            StudentFlag::Revert => "revert_flag_student",
            StudentFlag::Restore => "restore_in_class_flag",
            StudentFlag::Break => "break_flag",
            StudentFlag::Discontinue => "discontinuation_flag",
        }
    }
}

impl RolloutUpdateRequest {
    /// The student flags that are set, in priority order.
    pub fn set_flags(&self) -> Vec<StudentFlag> {
        let Self {
            cancel_flag_student,
            revert_flag_student,
            restore_in_class_flag,
            break_flag,
            discontinuation_flag,
            ..
        } = *self;
        [
            (cancel_flag_student, StudentFlag::Cancel),
            (revert_flag_student, StudentFlag::Revert),
            (restore_in_class_flag, StudentFlag::Restore),
            (break_flag, StudentFlag::Break),
            (discontinuation_flag, StudentFlag::Discontinue),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect()
    }

    /// Validate the body and resolve it into a single operation.
    ///
    /// Setting more than one student flag is rejected; the priority order of
    /// [`set_flags`](Self::set_flags) is only used to name them.
    pub fn resolve(self) -> Result<RequestedOperation, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let op = match self.set_flags().as_slice() {
            [] => self.into_reschedule()?,
            [flag] => {
                let student_id = require(self.student_id, "student_id")?;
                match flag {
                    StudentFlag::Cancel => RequestedOperation::CancelStudent { student_id },
                    StudentFlag::Revert => RequestedOperation::RevertStudent { student_id },
                    StudentFlag::Restore => RequestedOperation::RestoreFromBreak {
                        student_id,
                        range: self.date_range()?,
                    },
                    StudentFlag::Break => RequestedOperation::PlaceOnBreak {
                        student_id,
                        range: self.date_range()?,
                        reason: self.reason.unwrap_or_default(),
                    },
                    StudentFlag::Discontinue => RequestedOperation::Discontinue {
                        student_id,
                        effective_date: require(self.date, "date")?,
                        reason: self.reason.unwrap_or_default(),
                    },
                }
            }
            several => {
                let names: Vec<&str> = several.iter().map(|flag| flag.field()).collect();
                return Err(CoreError::Validation(format!(
                    "Only one student action may be requested at a time, got: {}",
                    names.join(", ")
                )));
            }
        };
        Ok(op)
    }

    fn into_reschedule(self) -> Result<RequestedOperation, CoreError> {
        if self.permanently && self.effective_date.is_none() {
            return Err(CoreError::Validation(
                "effective_date is required when permanently is set".into(),
            ));
        }
        Ok(RequestedOperation::Reschedule(RescheduleRequest {
            permanently: self.permanently,
            effective_date: self.effective_date,
            class_date: self.class_date,
            start_time: self.start_time,
            end_time: self.end_time,
            room_id: self.room,
            subject_id: self.subject,
            teacher_id: self.teacher,
            duration_id: self.duration,
            capacity: self.max_students,
        }))
    }

    fn date_range(&self) -> Result<DateRange, CoreError> {
        DateRange::new(
            require(self.start_date, "start_date")?,
            require(self.end_date, "end_date")?,
        )
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::Validation(format!("{field} is required")))
}

// ---------------------------------------------------------------------------
// Reschedule
// ---------------------------------------------------------------------------

/// The reschedule part of an update. `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescheduleRequest {
    pub permanently: bool,
    pub effective_date: Option<NaiveDate>,
    pub class_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub room_id: Option<DbId>,
    pub subject_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    pub duration_id: Option<DbId>,
    pub capacity: Option<i32>,
}

/// The schedulable fields of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub class_date: NaiveDate,
    pub time: TimeRange,
    pub room_id: DbId,
    pub subject_id: DbId,
    pub teacher_id: DbId,
    pub duration_id: DbId,
    pub capacity: i32,
}

impl RescheduleRequest {
    /// Merge the request over the occurrence's current slot.
    pub fn apply_to(&self, current: &ScheduleSlot) -> Result<ScheduleSlot, CoreError> {
        let time = TimeRange::new(
            self.start_time.unwrap_or(current.time.start()),
            self.end_time.unwrap_or(current.time.end()),
        )?;
        Ok(ScheduleSlot {
            class_date: self.class_date.unwrap_or(current.class_date),
            time,
            room_id: self.room_id.unwrap_or(current.room_id),
            subject_id: self.subject_id.unwrap_or(current.subject_id),
            teacher_id: self.teacher_id.unwrap_or(current.teacher_id),
            duration_id: self.duration_id.unwrap_or(current.duration_id),
            capacity: self.capacity.unwrap_or(current.capacity),
        })
    }
}

/// Accepts clock times as either `HH:MM` or `HH:MM:SS`.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{s}'"))),
        }
    }
}
