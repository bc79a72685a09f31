use chrono::{NaiveDate, NaiveTime, Utc};
use coachline_catalog::InventoryKey;
use coachline_core::events::emit;
use coachline_core::repository::{EventPublisher, NetworkRepository, ReservationRepository};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::models::events::{topics, TicketBookedEvent, TicketCancelledEvent};
use coachline_shared::{Masked, Ticket, TicketStatus, VehicleId};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const MAX_SEATS_PER_BOOKING: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub user_id: String,
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub source: String,
    pub destination: String,
    pub seats: Vec<String>,
}

impl BookingRequest {
    /// Shape checks that need no catalog or inventory lookups
    fn validate(&self) -> CoreResult<()> {
        if self.seats.is_empty() || self.seats.len() > MAX_SEATS_PER_BOOKING {
            return Err(CoreError::InvalidInput(format!(
                "between 1 and {} seats per booking, got {}",
                MAX_SEATS_PER_BOOKING,
                self.seats.len()
            )));
        }

        let mut unique = BTreeSet::new();
        for seat in &self.seats {
            if !unique.insert(seat.as_str()) {
                return Err(CoreError::InvalidInput(format!("seat {} requested more than once", seat)));
            }
        }

        if self.source.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(CoreError::InvalidInput("source and destination are required".to_string()));
        }
        if self.source.trim().eq_ignore_ascii_case(self.destination.trim()) {
            return Err(CoreError::InvalidInput("source and destination must differ".to_string()));
        }

        Ok(())
    }
}

/// Books and cancels seats against the inventory ledger
pub struct ReservationEngine {
    network: Arc<dyn NetworkRepository>,
    reservations: Arc<dyn ReservationRepository>,
    events: Arc<dyn EventPublisher>,
}

impl ReservationEngine {
    pub fn new(
        network: Arc<dyn NetworkRepository>,
        reservations: Arc<dyn ReservationRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            network,
            reservations,
            events,
        }
    }

    /// Reserve seats and issue a ticket. Nothing is committed on any error.
    pub async fn book(&self, request: BookingRequest) -> CoreResult<Ticket> {
        // 1. Request shape
        request.validate()?;

        // 2. Vehicle and layout
        let vehicle = self
            .network
            .get_vehicle(request.vehicle_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("vehicle {}", request.vehicle_id)))?;

        if let Some(seat) = request.seats.iter().find(|s| !vehicle.seat_layout.contains(s)) {
            return Err(CoreError::InvalidInput(format!(
                "seat {} does not exist on vehicle {}",
                seat, vehicle.id
            )));
        }

        // 3. Inventory; a conflicting seat wins over a missing price
        let inventory = self
            .reservations
            .get_or_create_inventory(&vehicle, request.journey_date)
            .await?;
        if let Some(seat) = inventory.first_conflict(&request.seats) {
            return Err(CoreError::SeatConflict(seat.to_string()));
        }

        // 4. Price; the ticket keeps the catalog's spelling so its sale matches the entry
        let entry = self
            .network
            .price_for(&request.source, &request.destination, &vehicle.category)
            .await?;
        let (source, destination) = entry.oriented_from(&request.source);

        // 5. Commit seats and ticket together
        let ticket = Ticket {
            id: Uuid::new_v4(),
            code: Ticket::generate_code(vehicle.id, request.journey_date),
            user_id: request.user_id,
            vehicle_id: vehicle.id,
            journey_date: request.journey_date,
            total_price: entry.price * request.seats.len() as i64,
            seats: request.seats,
            source,
            destination,
            category: vehicle.category.clone(),
            departure_time: request.departure_time,
            created_at: Utc::now(),
            status: TicketStatus::Booked,
        };
        let inventory = self.reservations.commit_booking(&ticket).await?;

        info!(
            "Booked {} for {}: vehicle {} on {} seats {:?} ({} left)",
            ticket.code,
            Masked(ticket.user_id.as_str()),
            ticket.vehicle_id,
            ticket.journey_date,
            ticket.seats,
            inventory.available_seats
        );

        let event = TicketBookedEvent {
            ticket_id: ticket.id,
            code: ticket.code.clone(),
            vehicle_id: ticket.vehicle_id,
            journey_date: ticket.journey_date,
            seats: ticket.seats.clone(),
            total_price: ticket.total_price,
            timestamp: ticket.created_at.timestamp(),
        };
        emit(self.events.as_ref(), topics::TICKET_BOOKED, &ticket.id.to_string(), &event).await;

        Ok(ticket)
    }

    /// Release the ticket's seats and mark it cancelled
    pub async fn cancel(&self, ticket_id: Uuid) -> CoreResult<Ticket> {
        let ticket = self.reservations.commit_cancellation(ticket_id).await?;

        info!(
            "Cancelled {}: vehicle {} on {} released {:?}",
            ticket.code, ticket.vehicle_id, ticket.journey_date, ticket.seats
        );

        let event = TicketCancelledEvent {
            ticket_id: ticket.id,
            vehicle_id: ticket.vehicle_id,
            journey_date: ticket.journey_date,
            seats: ticket.seats.clone(),
            timestamp: Utc::now().timestamp(),
        };
        emit(self.events.as_ref(), topics::TICKET_CANCELLED, &ticket.id.to_string(), &event).await;

        Ok(ticket)
    }

    pub async fn ticket(&self, ticket_id: Uuid) -> CoreResult<Ticket> {
        self.reservations
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("ticket {}", ticket_id)))
    }

    /// Newest first
    pub async fn tickets_for_user(&self, user_id: &str) -> CoreResult<Vec<Ticket>> {
        self.reservations.tickets_for_user(user_id).await
    }

    /// Labels taken on the vehicle for the date; empty before the first booking
    pub async fn booked_seats(&self, vehicle_id: VehicleId, journey_date: NaiveDate) -> CoreResult<Vec<String>> {
        let inventory = self
            .reservations
            .find_inventory(InventoryKey::new(vehicle_id, journey_date))
            .await?;
        Ok(inventory
            .map(|inv| inv.booked_seats.into_keys().collect())
            .unwrap_or_default())
    }
}
