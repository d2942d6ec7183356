//! Catalog and availability endpoints.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stockwatch_inventory::{DatacenterSet, Plan, Region};

use crate::api::error::ApiError;
use crate::api::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Create region routes: /v1/regions
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_regions))
        .route("/{region}/catalog/{country}", get(list_plans))
        .route("/{region}/availability", get(check_availability))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ListRegionsResponse {
    pub items: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    /// Restrict to one commercial range; empty selects uncategorized plans.
    pub category: Option<String>,
}

/// A plan with its effective price.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan_code: String,
    pub name: String,
    pub category: String,
    /// Effective price in currency units.
    pub price: f64,
    pub interval_unit: String,
    pub datacenters: Vec<String>,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        let pricing = plan.effective_pricing();
        Self {
            plan_code: plan.plan_code.clone(),
            name: plan.invoice_name.clone(),
            category: plan.category().to_string(),
            price: pricing.amount(),
            interval_unit: pricing.interval_unit,
            datacenters: plan.datacenters().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListPlansResponse {
    pub region: String,
    pub country: String,
    pub items: Vec<PlanResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub plan_code: String,
    /// Comma separated datacenter codes; absent means any.
    #[serde(default)]
    pub datacenters: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub region: String,
    pub plan_code: String,
    /// Datacenters with stock, sorted.
    pub datacenters: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /v1/regions
async fn list_regions(State(state): State<AppState>) -> Json<ListRegionsResponse> {
    Json(ListRegionsResponse {
        items: state.service().regions().to_vec(),
    })
}

/// GET /v1/regions/{region}/catalog/{country}
async fn list_plans(
    State(state): State<AppState>,
    ApiPath((region, country)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<ListPlansQuery>,
) -> Result<Json<ListPlansResponse>, ApiError> {
    let plans = state
        .service()
        .list_plans(&region, &country, query.category.as_deref())
        .await?;

    Ok(Json(ListPlansResponse {
        region,
        country: country.to_ascii_uppercase(),
        items: plans.iter().map(PlanResponse::from).collect(),
    }))
}

/// GET /v1/regions/{region}/availability
async fn check_availability(
    State(state): State<AppState>,
    ApiPath(region): ApiPath<String>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let plan_code = query.plan_code.trim();
    if plan_code.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_plan_code",
            "plan_code cannot be empty",
        ));
    }

    let datacenters = query
        .datacenters
        .as_deref()
        .map(DatacenterSet::parse)
        .unwrap_or_default();

    let available = state
        .service()
        .check_availability(&region, plan_code, &datacenters)
        .await?;

    Ok(Json(AvailabilityResponse {
        region,
        plan_code: plan_code.to_string(),
        datacenters: available,
    }))
}
