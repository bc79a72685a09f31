pub mod manager;
pub mod search;
pub mod verification;

#[cfg(test)]
mod fixtures;

pub use manager::{BookingRequest, ReservationEngine, MAX_SEATS_PER_BOOKING};
pub use search::TripSearch;
pub use verification::{TicketVerifier, Verification, VerifiedTicket};
