//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are created outside the mutation engine,
//! a `Deserialize` create DTO.

pub mod class_rollout;
pub mod enrollment;
pub mod outbox;
pub mod reference;
pub mod rollout_log;
