use chrono::{DateTime, Duration, Utc};
use coachline_catalog::InventoryKey;
use coachline_core::repository::{NetworkRepository, ReservationRepository};
use coachline_core::search::{TripOption, TripSearchRequest};
use coachline_core::{CoreError, CoreResult};
use std::sync::Arc;
use tracing::debug;

/// Default minimum gap between now and a bookable departure
pub const DEFAULT_LEAD_MINUTES: i64 = 15;

/// Finds vehicles travelling from one stop to another on a date
pub struct TripSearch {
    network: Arc<dyn NetworkRepository>,
    reservations: Arc<dyn ReservationRepository>,
    lead: Duration,
}

impl TripSearch {
    pub fn new(network: Arc<dyn NetworkRepository>, reservations: Arc<dyn ReservationRepository>) -> Self {
        Self {
            network,
            reservations,
            lead: Duration::minutes(DEFAULT_LEAD_MINUTES),
        }
    }

    pub fn with_lead_minutes(mut self, minutes: i64) -> Self {
        self.lead = Duration::minutes(minutes);
        self
    }

    pub async fn search(&self, request: &TripSearchRequest, now: DateTime<Utc>) -> CoreResult<Vec<TripOption>> {
        let source = request.source.trim();
        let destination = request.destination.trim();
        if source.is_empty() || destination.is_empty() {
            return Err(CoreError::InvalidInput("source and destination are required".to_string()));
        }

        let catalog = self.network.load_network().await?;
        let vehicles = self.network.list_vehicles().await?;
        let cutoff = now + self.lead;

        let mut options = Vec::new();
        for vehicle in catalog.vehicles_serving(source, destination, &vehicles) {
            let Some(route_id) = vehicle.route_id else { continue };

            if let Some(category) = &request.category {
                if !vehicle.category.eq_ignore_ascii_case(category.trim()) {
                    continue;
                }
            }

            let elapsed = match catalog.minutes_to_stop(vehicle, source) {
                Ok(minutes) => minutes,
                Err(e) => {
                    debug!("Skipping vehicle {}: {}", vehicle.id, e);
                    continue;
                }
            };
            // The run starts on the searched date; the stop may be reached after midnight
            let departs_at = request.date.and_time(vehicle.base_departure).and_utc() + Duration::minutes(elapsed);
            if departs_at < cutoff {
                continue;
            }

            let price = match catalog.price_for(source, destination, &vehicle.category) {
                Ok(p) => p,
                Err(e) => {
                    debug!("Skipping vehicle {}: {}", vehicle.id, e);
                    continue;
                }
            };
            if request.min_budget.is_some_and(|min| price < min) || request.max_budget.is_some_and(|max| price > max) {
                continue;
            }

            let available_seats = self
                .reservations
                .find_inventory(InventoryKey::new(vehicle.id, request.date))
                .await?
                .map(|inv| inv.available_seats)
                .unwrap_or_else(|| vehicle.seat_layout.seat_count());

            options.push(TripOption {
                vehicle_id: vehicle.id,
                route_id,
                operator_name: vehicle.operator_name.clone(),
                license_no: vehicle.license_no.clone(),
                category: vehicle.category.clone(),
                source: source.to_string(),
                destination: destination.to_string(),
                departure_time: departs_at.time(),
                departure_date: departs_at.date_naive(),
                price,
                available_seats,
            });
        }

        options.sort_by(|a, b| {
            (a.departure_date, a.departure_time, a.vehicle_id).cmp(&(b.departure_date, b.departure_time, b.vehicle_id))
        });
        debug!("Search {} -> {} on {}: {} options", source, destination, request.date, options.len());
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, labels, store, time, vehicle};
    use crate::manager::{BookingRequest, ReservationEngine};
    use chrono::NaiveDate;
    use coachline_catalog::{PriceEntry, Route};
    use coachline_shared::VehicleId;
    use coachline_store::events::LogEventPublisher;

    fn request(source: &str, destination: &str) -> TripSearchRequest {
        TripSearchRequest {
            source: source.into(),
            destination: destination.into(),
            date: date(),
            category: None,
            min_budget: None,
            max_budget: None,
        }
    }

    fn day_before() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 7, 6).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    fn ids(options: &[TripOption]) -> Vec<VehicleId> {
        options.iter().map(|o| o.vehicle_id).collect()
    }

    #[tokio::test]
    async fn test_search_finds_vehicles_in_direction() {
        let store = store();
        let search = TripSearch::new(store.clone(), store);

        let options = search.search(&request("Dhaka", "Chittagong"), day_before()).await.unwrap();
        assert_eq!(ids(&options), vec![1, 2]);
        assert_eq!(options[0].price, 1000);
        assert_eq!(options[1].price, 600);
        assert_eq!(options[0].available_seats, 8);
        assert_eq!(options[0].route_id, 1);

        let reverse = search.search(&request("Chittagong", "Dhaka"), day_before()).await.unwrap();
        assert!(reverse.is_empty());
    }

    #[tokio::test]
    async fn test_departure_is_at_source_stop() {
        let store = store();
        store.add_price(PriceEntry::new("Comilla", "Chittagong", "AC", 500));
        let search = TripSearch::new(store.clone(), store);

        // Dhaka 08:00 plus 120 minutes to Comilla
        let options = search.search(&request("Comilla", "Chittagong"), day_before()).await.unwrap();
        assert_eq!(ids(&options), vec![1]);
        assert_eq!(options[0].departure_time, time(10, 0));
        assert_eq!(options[0].price, 500);
    }

    #[tokio::test]
    async fn test_filters() {
        let store = store();
        let search = TripSearch::new(store.clone(), store);

        let mut req = request("Dhaka", "Chittagong");
        req.category = Some("non-ac".into());
        assert_eq!(ids(&search.search(&req, day_before()).await.unwrap()), vec![2]);

        let mut req = request("Dhaka", "Chittagong");
        req.min_budget = Some(600);
        req.max_budget = Some(999);
        assert_eq!(ids(&search.search(&req, day_before()).await.unwrap()), vec![2]);
    }

    #[tokio::test]
    async fn test_departures_inside_lead_time_are_hidden() {
        let store = store();
        let search = TripSearch::new(store.clone(), store);

        // 07:50 on the travel day: vehicle 1 leaves Dhaka at 08:00
        let now = date().and_hms_opt(7, 50, 0).unwrap().and_utc();
        let options = search.search(&request("Dhaka", "Chittagong"), now).await.unwrap();
        assert_eq!(ids(&options), vec![2]);
    }

    #[tokio::test]
    async fn test_available_seats_follow_inventory() {
        let store = store();
        let engine = ReservationEngine::new(store.clone(), store.clone(), Arc::new(LogEventPublisher::new()));
        engine
            .book(BookingRequest {
                user_id: "user-1".into(),
                vehicle_id: 1,
                journey_date: date(),
                departure_time: time(8, 0),
                source: "Dhaka".into(),
                destination: "Chittagong".into(),
                seats: labels(&["A1", "A2", "A3"]),
            })
            .await
            .unwrap();

        let search = TripSearch::new(store.clone(), store);
        let options = search.search(&request("Dhaka", "Chittagong"), day_before()).await.unwrap();
        assert_eq!(options[0].available_seats, 5);
        assert_eq!(options[1].available_seats, 8);
    }

    #[tokio::test]
    async fn test_overnight_run_departs_next_day() {
        let store = store();
        store.add_price(PriceEntry::new("Feni", "Chittagong", "AC", 300));
        // Leaves Dhaka 22:30, reaches Feni 210 minutes later at 02:00 the next day
        store.add_vehicle(vehicle(7, "Saintmartin", "AC", Some(1), time(22, 30)));
        let search = TripSearch::new(store.clone(), store);

        // 23:00 on the travel day: Dhaka departures are gone, the Feni stop is not
        let late = date().and_hms_opt(23, 0, 0).unwrap().and_utc();
        let options = search.search(&request("Feni", "Chittagong"), late).await.unwrap();
        assert_eq!(ids(&options), vec![7]);
        assert_eq!(options[0].departure_time, time(2, 0));
        assert_eq!(options[0].departure_date, date().succ_opt().unwrap());

        // Earlier same-day departures sort ahead of the overnight one
        let options = search.search(&request("Feni", "Chittagong"), day_before()).await.unwrap();
        assert_eq!(ids(&options), vec![1, 7]);
        assert_eq!(options[0].departure_time, time(11, 30));
        assert_eq!(options[0].departure_date, date());
    }

    #[tokio::test]
    async fn test_broken_segment_skips_vehicle() {
        let store = store();
        // No Tangail -> Dhaka duration, so departure at Dhaka is unknown
        store.add_route(Route::new(3, labels(&["Tangail", "Dhaka", "Sylhet"])).unwrap());
        store.add_vehicle(vehicle(9, "Saudia", "AC", Some(3), time(6, 0)));
        let search = TripSearch::new(store.clone(), store);

        let options = search.search(&request("Dhaka", "Sylhet"), day_before()).await.unwrap();
        assert_eq!(ids(&options), vec![3]);
    }

    #[tokio::test]
    async fn test_blank_stops_rejected() {
        let store = store();
        let search = TripSearch::new(store.clone(), store);
        let result = search.search(&request(" ", "Sylhet"), day_before()).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
