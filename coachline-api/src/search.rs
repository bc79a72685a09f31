use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use coachline_core::search::{TripOption, TripSearchRequest};
use coachline_core::CoreError;
use coachline_shared::VehicleId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips/search", post(search_trips))
        .route("/v1/vehicles/{id}/seats", get(seat_map))
        .route("/v1/stops", get(list_stops))
        .route("/v1/stops/{source}/destinations", get(list_destinations))
}

#[derive(Debug, Deserialize)]
pub struct SeatMapQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub seat_layout: Vec<Vec<String>>,
    pub booked_seats: Vec<String>,
}

/// POST /v1/trips/search
pub async fn search_trips(
    State(state): State<AppState>,
    Json(req): Json<TripSearchRequest>,
) -> Result<Json<Vec<TripOption>>, AppError> {
    Ok(Json(state.search.search(&req, Utc::now()).await?))
}

/// GET /v1/vehicles/{id}/seats?date=
pub async fn seat_map(
    State(state): State<AppState>,
    Path(vehicle_id): Path<VehicleId>,
    Query(query): Query<SeatMapQuery>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let vehicle = state
        .network
        .get_vehicle(vehicle_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("vehicle {}", vehicle_id)))?;
    let booked_seats = state.engine.booked_seats(vehicle_id, query.date).await?;

    Ok(Json(SeatMapResponse {
        vehicle_id,
        journey_date: query.date,
        seat_layout: vehicle.seat_layout.grid,
        booked_seats,
    }))
}

/// GET /v1/stops
pub async fn list_stops(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let network = state.network.load_network().await?;
    Ok(Json(network.stops()))
}

/// GET /v1/stops/{source}/destinations
/// Stops priced against `source`
pub async fn list_destinations(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let network = state.network.load_network().await?;
    Ok(Json(network.destinations_from(&source)))
}
