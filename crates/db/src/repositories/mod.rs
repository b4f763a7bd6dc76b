//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! that stand alone accept `&PgPool`; everything the mutation engine runs
//! inside its transaction accepts `&mut PgConnection` so callers can pass
//! `&mut *tx`.

pub mod class_rollout_log_repo;
pub mod class_rollout_repo;
pub mod enrollment_log_repo;
pub mod enrollment_repo;
pub mod outbox_repo;
pub mod reference_repo;

pub use class_rollout_log_repo::ClassRolloutLogRepo;
pub use class_rollout_repo::ClassRolloutRepo;
pub use enrollment_log_repo::EnrollmentLogRepo;
pub use enrollment_repo::EnrollmentRepo;
pub use outbox_repo::OutboxRepo;
pub use reference_repo::ReferenceRepo;
