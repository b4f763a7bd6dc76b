//! Domain rules for class rollouts.
//!
//! This crate has zero internal dependencies so the repository layer, the
//! delivery services and the API server can all share the same types and
//! invariants.

pub mod conflict;
pub mod enrollment;
pub mod error;
pub mod outbox;
pub mod recurrence;
pub mod request;
pub mod roles;
pub mod status;
pub mod time_range;
pub mod types;
