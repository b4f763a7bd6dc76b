pub mod class_rollout;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /class-rollouts/{id}         get, update, delete
/// /class-rollouts/{id}/logs    change history
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/class-rollouts", class_rollout::router())
}
