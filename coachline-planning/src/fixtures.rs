use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use coachline_catalog::{SeatLayout, Vehicle};
use coachline_shared::{RouteId, Ticket, TicketStatus, VehicleId};
use coachline_store::memory::MemoryStore;
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 2, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn vehicle(id: VehicleId, operator: &str, route_id: Option<RouteId>) -> Vehicle {
    Vehicle {
        id,
        operator_name: operator.into(),
        license_no: format!("CTG-{:04}", id),
        category: "AC".into(),
        base_departure: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        route_id,
        seat_layout: SeatLayout {
            id: 1,
            name: "AC 2+1".into(),
            category: "AC".into(),
            grid: vec![vec!["A1".into(), "".into(), "A2".into(), "A3".into()]],
        },
    }
}

/// A historical sale of `seats` seats, stored directly as a ticket
pub fn sale(
    store: &MemoryStore,
    vehicle_id: VehicleId,
    route: (&str, &str, &str),
    seats: u32,
    created_at: DateTime<Utc>,
) -> Ticket {
    let (source, destination, category) = route;
    let ticket = Ticket {
        id: Uuid::new_v4(),
        code: Ticket::generate_code(vehicle_id, created_at.date_naive()),
        user_id: "history".into(),
        vehicle_id,
        journey_date: NaiveDate::from_ymd_opt(2025, 7, 20).unwrap(),
        seats: (0..seats).map(|i| format!("S{}", i)).collect(),
        source: source.into(),
        destination: destination.into(),
        category: category.into(),
        total_price: 1000 * i64::from(seats),
        departure_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        created_at,
        status: TicketStatus::Booked,
    };
    store.add_ticket(ticket.clone());
    ticket
}
