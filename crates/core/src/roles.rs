//! Staff role names carried in access tokens.

/// Teachers may view and edit class rollouts.
pub const ROLE_TEACHER: &str = "teacher";

/// Managers may do everything a teacher can, plus delete rollouts.
pub const ROLE_MANAGER: &str = "manager";

/// Roles allowed to read and update class rollouts.
pub fn can_edit_rollouts(role: &str) -> bool {
    role == ROLE_TEACHER || role == ROLE_MANAGER
}

/// Roles allowed to cancel (delete) class rollouts.
pub fn can_delete_rollouts(role: &str) -> bool {
    role == ROLE_MANAGER
}
