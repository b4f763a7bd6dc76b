//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rollout_core::error::CoreError;
use rollout_core::roles::{can_delete_rollouts, can_edit_rollouts};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `teacher` or `manager`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn view(RequireTeacher(user): RequireTeacher) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireTeacher(pub AuthUser);

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_edit_rollouts(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Teacher or Manager role required".into(),
            )));
        }
        Ok(RequireTeacher(user))
    }
}

/// Requires the `manager` role. Rejects with 403 Forbidden otherwise.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_delete_rollouts(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Manager role required".into(),
            )));
        }
        Ok(RequireManager(user))
    }
}
