pub mod events;
pub mod repository;
pub mod search;

use coachline_catalog::{CatalogError, InventoryError, PolicyError};
use coachline_shared::RouteId;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Seat {0} is already booked")]
    SeatConflict(String),
    #[error("No price for {origin} -> {destination} [{category}]")]
    PriceUnavailable {
        origin: String,
        destination: String,
        category: String,
    },
    #[error("Missing segment duration {from} -> {to}")]
    MissingSegment { from: String, to: String },
    #[error("Stop {stop} is not on route {route_id}")]
    StopNotOnRoute { stop: String, route_id: RouteId },
    #[error("Ticket {0} is already cancelled")]
    AlreadyCancelled(Uuid),
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),
    #[error("Job {0} is already running")]
    JobInProgress(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        CoreError::Storage(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidRoute(msg) => CoreError::InvalidInput(msg),
            CatalogError::PriceUnavailable { origin, destination, category } => {
                CoreError::PriceUnavailable { origin, destination, category }
            }
            CatalogError::DurationUnavailable(from, to) => CoreError::MissingSegment { from, to },
            CatalogError::StopNotOnRoute { stop, route_id } => CoreError::StopNotOnRoute { stop, route_id },
            CatalogError::MissingSegment { from, to } => CoreError::MissingSegment { from, to },
            CatalogError::Unassigned(vehicle_id) => {
                CoreError::NotFound(format!("route for vehicle {}", vehicle_id))
            }
            CatalogError::RouteNotFound(route_id) => CoreError::NotFound(format!("route {}", route_id)),
        }
    }
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::SeatConflict(seat) => CoreError::SeatConflict(seat),
            InventoryError::DuplicateSeat(_) | InventoryError::InsufficientSeats { .. } => {
                CoreError::InvalidInput(err.to_string())
            }
            InventoryError::NotFound { .. } => CoreError::NotFound(err.to_string()),
        }
    }
}

impl From<PolicyError> for CoreError {
    fn from(err: PolicyError) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}
