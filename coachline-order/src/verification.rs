use chrono::{NaiveDate, NaiveTime};
use coachline_core::repository::{NetworkRepository, ReservationRepository};
use coachline_core::CoreResult;
use coachline_shared::TicketStatus;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerifiedTicket {
    pub code: String,
    pub operator_name: String,
    pub license_no: String,
    pub category: String,
    pub source: String,
    pub destination: String,
    pub journey_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub seats: Vec<String>,
    pub total_price: i64,
    pub status: TicketStatus,
    /// False once the ticket is cancelled
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verification {
    Verified(VerifiedTicket),
    NotVerified,
}

/// Lets an operator check a ticket code at boarding
pub struct TicketVerifier {
    network: Arc<dyn NetworkRepository>,
    reservations: Arc<dyn ReservationRepository>,
}

impl TicketVerifier {
    pub fn new(network: Arc<dyn NetworkRepository>, reservations: Arc<dyn ReservationRepository>) -> Self {
        Self { network, reservations }
    }

    /// Unknown codes and tickets sold by another operator are `NotVerified`
    pub async fn verify(&self, code: &str, operator_name: &str) -> CoreResult<Verification> {
        let Some(ticket) = self.reservations.find_ticket_by_code(code.trim()).await? else {
            return Ok(Verification::NotVerified);
        };
        let Some(vehicle) = self.network.get_vehicle(ticket.vehicle_id).await? else {
            return Ok(Verification::NotVerified);
        };

        if !vehicle.operator_name.trim().eq_ignore_ascii_case(operator_name.trim()) {
            info!("Ticket {} presented to {} but sold by {}", ticket.code, operator_name, vehicle.operator_name);
            return Ok(Verification::NotVerified);
        }

        Ok(Verification::Verified(VerifiedTicket {
            valid: ticket.is_booked(),
            code: ticket.code,
            operator_name: vehicle.operator_name,
            license_no: vehicle.license_no,
            category: ticket.category,
            source: ticket.source,
            destination: ticket.destination,
            journey_date: ticket.journey_date,
            departure_time: ticket.departure_time,
            seats: ticket.seats,
            total_price: ticket.total_price,
            status: ticket.status,
        }))
    }
}
