//! API v1 routes.

mod catalog;
mod subscriptions;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/regions", catalog::routes())
        // Subscriptions are keyed by user: /v1/users/{user_id}/subscriptions
        .nest("/users/{user_id}/subscriptions", subscriptions::routes())
}
