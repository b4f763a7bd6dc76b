/// Primary keys of rollouts, enrollments, staff and reference rows (BIGSERIAL).
pub type DbId = i64;

/// Ids of the `*_statuses` lookup tables (SMALLSERIAL).
pub type StatusId = i16;

/// Audit and outbox timestamps, always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
