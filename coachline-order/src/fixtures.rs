use chrono::{NaiveDate, NaiveTime};
use coachline_catalog::{DurationEntry, PriceEntry, Route, SeatLayout, Vehicle};
use coachline_shared::{RouteId, VehicleId};
use coachline_store::memory::MemoryStore;
use std::sync::Arc;

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 7).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn vehicle(id: VehicleId, operator: &str, category: &str, route_id: Option<RouteId>, departs: NaiveTime) -> Vehicle {
    Vehicle {
        id,
        operator_name: operator.into(),
        license_no: format!("DHA-{:04}", id),
        category: category.into(),
        base_departure: departs,
        route_id,
        seat_layout: SeatLayout {
            id: 1,
            name: "2+2 Standard".into(),
            category: category.into(),
            grid: vec![labels(&["A1", "A2", "", "A3", "A4"]), labels(&["B1", "B2", "", "B3", "B4"])],
        },
    }
}

/// Dhaka hub with a coastal and a northern line
pub fn store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();

    store.add_route(Route::new(1, labels(&["Dhaka", "Comilla", "Feni", "Chittagong"])).unwrap());
    store.add_route(Route::new(2, labels(&["Dhaka", "Sylhet"])).unwrap());

    for (a, b, minutes) in [("Dhaka", "Comilla", 120), ("Comilla", "Feni", 90), ("Feni", "Chittagong", 120), ("Dhaka", "Sylhet", 240)] {
        store.add_duration(DurationEntry { stop1: a.into(), stop2: b.into(), minutes });
    }

    store.add_price(PriceEntry::new("Dhaka", "Chittagong", "AC", 1000));
    store.add_price(PriceEntry::new("Dhaka", "Chittagong", "Non-AC", 600));
    store.add_price(PriceEntry::new("Dhaka", "Feni", "AC", 700));
    store.add_price(PriceEntry::new("Dhaka", "Sylhet", "AC", 900));

    store.add_vehicle(vehicle(1, "Green Line", "AC", Some(1), time(8, 0)));
    store.add_vehicle(vehicle(2, "Hanif", "Non-AC", Some(1), time(10, 0)));
    store.add_vehicle(vehicle(3, "Ena", "AC", Some(2), time(9, 0)));
    store.add_vehicle(vehicle(4, "Shyamoli", "AC", None, time(7, 0)));

    Arc::new(store)
}
