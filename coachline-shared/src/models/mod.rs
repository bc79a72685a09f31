pub mod events;
pub mod ticket;
