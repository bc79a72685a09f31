use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use coachline_catalog::{CapacityPolicy, PricingPolicy};
use coachline_planning::{jobs, PriceAdjustmentReport, RerouteRecord, RouteSales, DEFAULT_WINDOW_DAYS};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/pricing-policy", get(get_pricing_policy).put(put_pricing_policy))
        .route("/v1/admin/capacity-policy", get(get_capacity_policy).put(put_capacity_policy))
        .route("/v1/admin/jobs/price-adjustment", post(run_price_adjustment))
        .route("/v1/admin/jobs/rebalance", post(run_rebalance))
        .route("/v1/admin/sales", get(sales_report))
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub days: Option<i64>,
}

// ============================================================================
// Policies
// ============================================================================

/// GET /v1/admin/pricing-policy
/// Falls back to the documented defaults when nothing is stored
pub async fn get_pricing_policy(State(state): State<AppState>) -> Result<Json<PricingPolicy>, AppError> {
    let policy = state.policies.pricing_policy().await?.unwrap_or_default();
    Ok(Json(policy))
}

/// PUT /v1/admin/pricing-policy
pub async fn put_pricing_policy(
    State(state): State<AppState>,
    Json(policy): Json<PricingPolicy>,
) -> Result<Json<PricingPolicy>, AppError> {
    state.policies.save_pricing_policy(&policy).await?;
    tracing::info!(
        "Pricing policy replaced: [{}, {}] +{}% -{}%",
        policy.min_price,
        policy.max_price,
        policy.increase_percent,
        policy.decrease_percent
    );
    Ok(Json(policy))
}

/// GET /v1/admin/capacity-policy
pub async fn get_capacity_policy(State(state): State<AppState>) -> Result<Json<CapacityPolicy>, AppError> {
    let policy = state.policies.capacity_policy().await?.unwrap_or_default();
    Ok(Json(policy))
}

/// PUT /v1/admin/capacity-policy
pub async fn put_capacity_policy(
    State(state): State<AppState>,
    Json(policy): Json<CapacityPolicy>,
) -> Result<Json<CapacityPolicy>, AppError> {
    state.policies.save_capacity_policy(&policy).await?;
    tracing::info!("Capacity policy replaced: {:?}", policy);
    Ok(Json(policy))
}

// ============================================================================
// Jobs
// ============================================================================

/// POST /v1/admin/jobs/price-adjustment
pub async fn run_price_adjustment(State(state): State<AppState>) -> Result<Json<PriceAdjustmentReport>, AppError> {
    let adjuster = state.price_adjuster.clone();
    let report = state
        .runner
        .run_exclusive(jobs::PRICE_ADJUSTMENT, || async move { adjuster.run().await })
        .await?;
    Ok(Json(report))
}

/// POST /v1/admin/jobs/rebalance
/// Returns the audit records of this run
pub async fn run_rebalance(State(state): State<AppState>) -> Result<Json<Vec<RerouteRecord>>, AppError> {
    let rebalancer = state.rebalancer.clone();
    let records = state
        .runner
        .run_exclusive(jobs::CAPACITY_REBALANCE, || async move { rebalancer.run().await })
        .await?;
    Ok(Json(records))
}

/// GET /v1/admin/sales?days=
pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<Vec<RouteSales>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if days <= 0 {
        return Err(AppError::BadRequest(format!("days must be positive, got {}", days)));
    }
    let rows = state.reporter.report(Utc::now() - Duration::days(days)).await?;
    Ok(Json(rows))
}
