use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use coachline_order::{BookingRequest, Verification};
use coachline_shared::Ticket;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tickets", post(book_ticket))
        .route("/v1/tickets/verify", get(verify_ticket))
        .route("/v1/tickets/{id}", get(get_ticket))
        .route("/v1/tickets/{id}/cancel", post(cancel_ticket))
        .route("/v1/users/{user_id}/tickets", get(user_tickets))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub code: String,
    pub operator: String,
}

/// POST /v1/tickets
pub async fn book_ticket(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let ticket = state.engine.book(req).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// POST /v1/tickets/{id}/cancel
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.engine.cancel(ticket_id).await?))
}

/// GET /v1/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.engine.ticket(ticket_id).await?))
}

/// GET /v1/users/{user_id}/tickets
/// Newest first
pub async fn user_tickets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(state.engine.tickets_for_user(&user_id).await?))
}

/// GET /v1/tickets/verify?code=&operator=
pub async fn verify_ticket(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<Verification>, AppError> {
    if query.code.trim().is_empty() {
        return Err(AppError::BadRequest("code is required".to_string()));
    }
    Ok(Json(state.verifier.verify(query.code.trim(), &query.operator).await?))
}
