//! Subscription endpoints.
//!
//! Subscriptions are nested under users: /v1/users/{user_id}/subscriptions

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stockwatch_inventory::{DatacenterSet, DEFAULT_REGION};

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::db::{User, UserSubscription};
use crate::state::AppState;

/// Create subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_subscriptions)
                .post(subscribe)
                .delete(unsubscribe_all),
        )
        .route("/{criterion_id}", delete(unsubscribe))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to watch a plan.
#[derive(Debug, Deserialize, Serialize)]
pub struct SubscribeRequest {
    #[serde(default = "default_region")]
    pub region: String,

    pub plan_code: String,

    /// Datacenters to watch; empty watches all.
    #[serde(default)]
    pub datacenters: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub criterion_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ListSubscriptionsResponse {
    pub items: Vec<UserSubscription>,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeAllResponse {
    pub removed: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /v1/users/{user_id}/subscriptions
async fn list_subscriptions(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<ListSubscriptionsResponse>, ApiError> {
    let items = state.service().list_for_user(user_id).await?;
    Ok(Json(ListSubscriptionsResponse { items }))
}

/// POST /v1/users/{user_id}/subscriptions
async fn subscribe(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(req): ApiJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let plan_code = req.plan_code.trim();
    if plan_code.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_plan_code",
            "plan_code cannot be empty",
        ));
    }

    let user = User {
        id: user_id,
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
    };
    let datacenters = DatacenterSet::new(&req.datacenters);

    let criterion_id = state
        .service()
        .subscribe(&user, req.region.trim(), plan_code, &datacenters)
        .await?;

    Ok((StatusCode::CREATED, Json(SubscribeResponse { criterion_id })))
}

/// DELETE /v1/users/{user_id}/subscriptions
async fn unsubscribe_all(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UnsubscribeAllResponse>, ApiError> {
    let removed = state.service().unsubscribe_all(user_id).await?;
    Ok(Json(UnsubscribeAllResponse { removed }))
}

/// DELETE /v1/users/{user_id}/subscriptions/{criterion_id}
async fn unsubscribe(
    State(state): State<AppState>,
    ApiPath((user_id, criterion_id)): ApiPath<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.service().unsubscribe(user_id, criterion_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
