use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VehicleId = i64;
pub type RouteId = i64;

/// Ticket status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Booked,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Booked => "BOOKED",
            TicketStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BOOKED" => Some(TicketStatus::Booked),
            "CANCELLED" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}

/// A confirmed booking of specific seats on one vehicle for one journey date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub code: String,
    pub user_id: String,
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub seats: Vec<String>,
    pub source: String,
    pub destination: String,
    /// Vehicle category at booking time
    pub category: String,
    pub total_price: i64,
    pub departure_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
}

impl Ticket {
    /// `TKT-{vehicle}-{yyyymmdd}-{10 hex chars}`
    pub fn generate_code(vehicle_id: VehicleId, journey_date: NaiveDate) -> String {
        let random = Uuid::new_v4().simple().to_string()[..10].to_uppercase();
        format!("TKT-{}-{}-{}", vehicle_id, journey_date.format("%Y%m%d"), random)
    }

    pub fn seat_count(&self) -> u32 {
        self.seats.len() as u32
    }

    pub fn is_booked(&self) -> bool {
        self.status == TicketStatus::Booked
    }

    /// Mark as cancelled (tickets are never deleted)
    pub fn cancel(&mut self) {
        self.status = TicketStatus::Cancelled;
    }

    pub fn sale_record(&self) -> SaleRecord {
        SaleRecord {
            ticket_id: self.id,
            vehicle_id: self.vehicle_id,
            source: self.source.clone(),
            destination: self.destination.clone(),
            category: self.category.clone(),
            seat_count: self.seat_count(),
            total_price: self.total_price,
            created_at: self.created_at,
            status: self.status,
        }
    }
}

/// Historical sales row consumed by the planning jobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleRecord {
    pub ticket_id: Uuid,
    pub vehicle_id: VehicleId,
    pub source: String,
    pub destination: String,
    pub category: String,
    pub seat_count: u32,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
}

impl SaleRecord {
    pub fn is_booked(&self) -> bool {
        self.status == TicketStatus::Booked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_code_format() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        let code = Ticket::generate_code(42, date);

        assert!(code.starts_with("TKT-42-20250707-"));
        let suffix = code.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_ticket_codes_differ() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();
        assert_ne!(Ticket::generate_code(1, date), Ticket::generate_code(1, date));
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [TicketStatus::Booked, TicketStatus::Cancelled] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("PENDING"), None);
    }
}
