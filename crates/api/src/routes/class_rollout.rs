//! Route definitions for the `/class-rollouts` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::class_rollout;
use crate::state::AppState;

/// Routes mounted at `/class-rollouts`.
///
/// ```text
/// GET    /{id}        -> get_by_id   (teacher)
/// PUT    /{id}        -> update      (teacher)
/// DELETE /{id}        -> delete      (manager)
/// GET    /{id}/logs   -> list_logs   (teacher)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(class_rollout::get_by_id)
                .put(class_rollout::update)
                .delete(class_rollout::delete),
        )
        .route("/{id}/logs", get(class_rollout::list_logs))
}
