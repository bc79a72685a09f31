use chrono::NaiveDate;
use uuid::Uuid;

use super::ticket::{RouteId, VehicleId};

pub mod topics {
    pub const TICKET_BOOKED: &str = "tickets.booked";
    pub const TICKET_CANCELLED: &str = "tickets.cancelled";
    pub const PRICE_ADJUSTED: &str = "pricing.adjusted";
    pub const VEHICLE_REROUTED: &str = "fleet.rerouted";
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TicketBookedEvent {
    pub ticket_id: Uuid,
    pub code: String,
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub seats: Vec<String>,
    pub total_price: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TicketCancelledEvent {
    pub ticket_id: Uuid,
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub seats: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PriceAdjustedEvent {
    pub stop1: String,
    pub stop2: String,
    pub category: String,
    pub old_price: i64,
    pub new_price: i64,
    pub seats_sold: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct VehicleReroutedEvent {
    pub vehicle_id: VehicleId,
    pub company_name: String,
    pub old_route_id: Option<RouteId>,
    pub new_route_id: RouteId,
    pub timestamp: i64,
}
