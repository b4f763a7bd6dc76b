use crate::types::DbId;

/// Errors raised by rollout rules and request resolution.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The request is malformed or asks for something the rules forbid.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A stored row breaks an invariant, e.g. an unknown status id or an
    /// enrollment whose occurrence columns disagree with its status.
    #[error("Inconsistent data: {0}")]
    Integrity(String),
}
