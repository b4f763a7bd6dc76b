//! Status enums mapping to SMALLSERIAL lookup tables.
//!
//! Each variant's discriminant matches the seed data order (1-based) in the
//! corresponding `*_statuses` table, and its name matches the `name` column.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
pub use crate::types::StatusId;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the lookup-table name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( x if x == $val => Ok($name::$variant), )+
                    _ => Err(CoreError::Integrity(format!(
                        "Unknown {} id {id}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle status of a single class occurrence.
    ClassStatus {
        Scheduled = 1 => "scheduled",
        Present = 2 => "present",
        Modified = 3 => "modified",
        Cancelled = 4 => "cancelled",
        Discontinued = 5 => "discontinued",
    }
}

define_status_enum! {
    /// Status of a student's enrollment in an occurrence.
    EnrollmentStatus {
        Scheduled = 1 => "scheduled",
        Cancelled = 2 => "cancelled",
        Break = 3 => "break",
        Discontinued = 4 => "discontinued",
    }
}

impl ClassStatus {
    /// Statuses that occupy the teacher's time slot.
    pub const TEACHER_BUSY: [ClassStatus; 3] = [
        ClassStatus::Scheduled,
        ClassStatus::Present,
        ClassStatus::Modified,
    ];

    /// Status IDs of [`ClassStatus::TEACHER_BUSY`], ready for `= ANY($n)`.
    pub fn teacher_busy_ids() -> Vec<StatusId> {
        Self::TEACHER_BUSY.iter().map(|s| s.id()).collect()
    }
}

impl EnrollmentStatus {
    /// Statuses a restore-from-break request brings back into class.
    pub const RESTORABLE: [EnrollmentStatus; 2] =
        [EnrollmentStatus::Discontinued, EnrollmentStatus::Break];

    pub fn restorable_ids() -> Vec<StatusId> {
        Self::RESTORABLE.iter().map(|s| s.id()).collect()
    }
}
