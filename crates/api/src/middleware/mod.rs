//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated staff member from a JWT Bearer token.
//! - [`rbac::RequireTeacher`] -- Requires `teacher` or `manager`.
//! - [`rbac::RequireManager`] -- Requires `manager`.

pub mod auth;
pub mod rbac;
