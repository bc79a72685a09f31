pub mod models;
pub mod pii;

pub use models::ticket::{RouteId, SaleRecord, Ticket, TicketStatus, VehicleId};
pub use pii::Masked;
