//! Handlers for the `/class-rollouts` resource.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use rollout_core::error::CoreError;
use rollout_core::request::{DeleteRolloutRequest, RolloutUpdateRequest};
use rollout_core::types::DbId;
use rollout_db::models::class_rollout::ClassRolloutDetail;
use rollout_db::models::rollout_log::ClassRolloutLog;
use rollout_db::repositories::{ClassRolloutLogRepo, ClassRolloutRepo};

use crate::engine::{RolloutChange, RolloutMutationEngine, UpdateOutcome};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireManager, RequireTeacher};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/class-rollouts/{id}
pub async fn get_by_id(
    RequireTeacher(_user): RequireTeacher,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClassRolloutDetail>>> {
    let mut conn = state.pool.acquire().await?;
    let detail = ClassRolloutRepo::find_detail(&mut *conn, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClassRollout",
            id,
        }))?;
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/class-rollouts/{id}
///
/// Returns `outcome: "blocked"` with the conflicting class when a reschedule
/// would double-book the teacher.
pub async fn update(
    RequireTeacher(user): RequireTeacher,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RolloutUpdateRequest>,
) -> AppResult<Json<DataResponse<UpdateOutcome>>> {
    let outcome = RolloutMutationEngine::from_state(&state)
        .update(id, input, user.staff_id)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// DELETE /api/v1/class-rollouts/{id}
///
/// The body is optional; without one only this rollout is cancelled.
pub async fn delete(
    RequireManager(user): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Bytes,
) -> AppResult<Json<DataResponse<RolloutChange>>> {
    let input = parse_delete_body(&body)?;
    let change = RolloutMutationEngine::from_state(&state)
        .delete(id, input, user.staff_id)
        .await?;
    Ok(Json(DataResponse { data: change }))
}

/// GET /api/v1/class-rollouts/{id}/logs
pub async fn list_logs(
    RequireTeacher(_user): RequireTeacher,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ClassRolloutLog>>>> {
    ClassRolloutRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClassRollout",
            id,
        }))?;
    let logs = ClassRolloutLogRepo::list_for_rollout(&state.pool, id).await?;
    Ok(Json(DataResponse { data: logs }))
}

fn parse_delete_body(body: &[u8]) -> AppResult<DeleteRolloutRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeleteRolloutRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid delete request body: {e}")))
}
