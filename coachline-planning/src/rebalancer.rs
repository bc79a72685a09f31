use chrono::{DateTime, Duration, Utc};
use coachline_catalog::{CapacityPolicy, Vehicle};
use coachline_core::events::emit;
use coachline_core::repository::{EventPublisher, NetworkRepository, PolicyRepository, SalesFeed};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::models::events::{topics, VehicleReroutedEvent};
use coachline_shared::{RouteId, SaleRecord, VehicleId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info};

use crate::DEFAULT_WINDOW_DAYS;

/// Audit entry for one vehicle moved to another route
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RerouteRecord {
    pub vehicle_id: VehicleId,
    pub company_name: String,
    pub old_route_id: Option<RouteId>,
    pub new_route_id: RouteId,
}

/// Moves underused vehicles onto routes with strong demand
pub struct CapacityRebalancer {
    network: Arc<dyn NetworkRepository>,
    policies: Arc<dyn PolicyRepository>,
    sales: Arc<dyn SalesFeed>,
    events: Arc<dyn EventPublisher>,
    window: Duration,
}

impl CapacityRebalancer {
    pub fn new(
        network: Arc<dyn NetworkRepository>,
        policies: Arc<dyn PolicyRepository>,
        sales: Arc<dyn SalesFeed>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            network,
            policies,
            sales,
            events,
            window: Duration::days(DEFAULT_WINDOW_DAYS),
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window = Duration::days(days);
        self
    }

    pub async fn run(&self) -> CoreResult<Vec<RerouteRecord>> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> CoreResult<Vec<RerouteRecord>> {
        let policy = self
            .policies
            .capacity_policy()
            .await?
            .ok_or_else(|| CoreError::ConfigMissing("capacity policy".to_string()))?;

        let since = now - self.window;
        let sales: Vec<SaleRecord> = self
            .sales
            .sales_since(since)
            .await?
            .into_iter()
            .filter(|s| s.is_booked() && s.created_at >= since && s.created_at <= now)
            .collect();
        let vehicles = self.network.list_vehicles().await?;

        let plan = plan_reroutes(&policy, &vehicles, &sales);
        let mut audit = Vec::with_capacity(plan.len());

        for record in plan {
            if let Err(e) = self.network.assign_route(record.vehicle_id, record.new_route_id).await {
                error!(
                    "Failed to move vehicle {} to route {}: {}",
                    record.vehicle_id, record.new_route_id, e
                );
                continue;
            }

            info!(
                "Vehicle {} ({}) moved from route {:?} to {}",
                record.vehicle_id, record.company_name, record.old_route_id, record.new_route_id
            );
            let event = VehicleReroutedEvent {
                vehicle_id: record.vehicle_id,
                company_name: record.company_name.clone(),
                old_route_id: record.old_route_id,
                new_route_id: record.new_route_id,
                timestamp: now.timestamp(),
            };
            emit(self.events.as_ref(), topics::VEHICLE_REROUTED, &record.vehicle_id.to_string(), &event).await;
            audit.push(record);
        }

        info!("Capacity rebalance done: {} vehicles rerouted", audit.len());
        Ok(audit)
    }
}

/// Pure selection step: which vehicles go where, before anything is written.
///
/// Demand is seats sold per vehicle in `sales`; a route's demand is the sum
/// over the vehicles currently assigned to it. Low performers are taken in
/// ascending demand order and dealt round-robin over the high-demand routes,
/// busiest first.
pub fn plan_reroutes(policy: &CapacityPolicy, vehicles: &[Vehicle], sales: &[SaleRecord]) -> Vec<RerouteRecord> {
    let mut vehicle_demand: HashMap<VehicleId, u32> = HashMap::new();
    for sale in sales {
        *vehicle_demand.entry(sale.vehicle_id).or_default() += sale.seat_count;
    }
    let demand_of = |id: VehicleId| vehicle_demand.get(&id).copied().unwrap_or(0);

    let mut route_demand: BTreeMap<RouteId, u32> = BTreeMap::new();
    for vehicle in vehicles {
        if let Some(route_id) = vehicle.route_id {
            *route_demand.entry(route_id).or_default() += demand_of(vehicle.id);
        }
    }

    let mut high_demand: Vec<(RouteId, u32)> = route_demand
        .into_iter()
        .filter(|(_, demand)| *demand >= policy.high_demand_threshold)
        .collect();
    if high_demand.is_empty() {
        return Vec::new();
    }
    high_demand.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let high_routes: Vec<RouteId> = high_demand.iter().map(|(id, _)| *id).collect();
    let high_set: BTreeSet<RouteId> = high_routes.iter().copied().collect();

    let mut low_performers: Vec<&Vehicle> = vehicles
        .iter()
        .filter(|v| demand_of(v.id) <= policy.underperform_threshold)
        .collect();
    low_performers.sort_by_key(|v| (demand_of(v.id), v.id));

    low_performers
        .into_iter()
        .filter(|v| v.route_id.map_or(true, |id| !high_set.contains(&id)))
        .take(policy.max_reroutes_per_run as usize)
        .enumerate()
        .map(|(i, v)| RerouteRecord {
            vehicle_id: v.id,
            company_name: v.operator_name.clone(),
            old_route_id: v.route_id,
            new_route_id: high_routes[i % high_routes.len()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{days_ago, now, sale, vehicle};
    use async_trait::async_trait;
    use coachline_catalog::{NetworkCatalog, PriceEntry};
    use coachline_store::events::LogEventPublisher;
    use coachline_store::memory::MemoryStore;

    const ROUTE_A: RouteId = 1;
    const ROUTE_B: RouteId = 2;
    const ROUTE_C: RouteId = 3;
    const TRIP: (&str, &str, &str) = ("Dhaka", "Chittagong", "AC");

    fn policy(max: u32) -> CapacityPolicy {
        CapacityPolicy {
            max_reroutes_per_run: max,
            underperform_threshold: 20,
            high_demand_threshold: 200,
        }
    }

    fn rebalancer(store: Arc<MemoryStore>) -> CapacityRebalancer {
        CapacityRebalancer::new(store.clone(), store.clone(), store, Arc::new(LogEventPublisher::new()))
    }

    fn record(vehicle_id: VehicleId, company: &str, old: Option<RouteId>, new: RouteId) -> RerouteRecord {
        RerouteRecord {
            vehicle_id,
            company_name: company.into(),
            old_route_id: old,
            new_route_id: new,
        }
    }

    #[tokio::test]
    async fn test_moves_low_performers_to_busy_route() {
        let store = Arc::new(MemoryStore::new());
        store.add_vehicle(vehicle(1, "Hanif", Some(ROUTE_A)));
        store.add_vehicle(vehicle(2, "Shohagh", Some(ROUTE_A)));
        store.add_vehicle(vehicle(3, "Green Line", Some(ROUTE_B)));
        store.set_capacity_policy(Some(policy(3)));

        sale(&store, 1, TRIP, 5, days_ago(4));
        sale(&store, 2, TRIP, 10, days_ago(4));
        for _ in 0..125 {
            sale(&store, 3, TRIP, 4, days_ago(6));
        }

        let audit = rebalancer(store.clone()).run_at(now()).await.unwrap();

        assert_eq!(
            audit,
            vec![
                record(1, "Hanif", Some(ROUTE_A), ROUTE_B),
                record(2, "Shohagh", Some(ROUTE_A), ROUTE_B),
            ]
        );
        assert_eq!(store.get_vehicle(1).await.unwrap().unwrap().route_id, Some(ROUTE_B));
        assert_eq!(store.get_vehicle(2).await.unwrap().unwrap().route_id, Some(ROUTE_B));
        assert_eq!(store.get_vehicle(3).await.unwrap().unwrap().route_id, Some(ROUTE_B));
    }

    #[test]
    fn test_round_robin_and_cap() {
        let vehicles = vec![
            vehicle(10, "Ena", Some(ROUTE_A)),
            vehicle(11, "Ena", None),
            vehicle(12, "Ena", Some(ROUTE_A)),
            vehicle(20, "Saudia", Some(ROUTE_B)),
            vehicle(30, "Tuba", Some(ROUTE_C)),
        ];
        let mut sales = Vec::new();
        let store = MemoryStore::new();
        for _ in 0..80 {
            sales.push(sale(&store, 20, TRIP, 4, days_ago(1)).sale_record());
        }
        for _ in 0..60 {
            sales.push(sale(&store, 30, TRIP, 4, days_ago(1)).sale_record());
        }
        sales.push(sale(&store, 12, TRIP, 3, days_ago(1)).sale_record());

        // B (320) outranks C (240); 11 and 10 have no sales, 12 sold 3
        let plan = plan_reroutes(&policy(2), &vehicles, &sales);
        assert_eq!(
            plan,
            vec![record(10, "Ena", Some(ROUTE_A), ROUTE_B), record(11, "Ena", None, ROUTE_C)]
        );

        let plan = plan_reroutes(&policy(10), &vehicles, &sales);
        let targets: Vec<RouteId> = plan.iter().map(|r| r.new_route_id).collect();
        assert_eq!(targets, vec![ROUTE_B, ROUTE_C, ROUTE_B]);
    }

    #[test]
    fn test_no_high_demand_route_means_no_changes() {
        let vehicles = vec![vehicle(1, "Hanif", Some(ROUTE_A)), vehicle(2, "Hanif", None)];
        assert!(plan_reroutes(&policy(50), &vehicles, &[]).is_empty());
    }

    #[test]
    fn test_low_performer_on_busy_route_stays() {
        let store = MemoryStore::new();
        let vehicles = vec![vehicle(1, "Hanif", Some(ROUTE_B)), vehicle(2, "Hanif", Some(ROUTE_B))];
        let sales: Vec<SaleRecord> = (0..60).map(|_| sale(&store, 1, TRIP, 4, days_ago(1)).sale_record()).collect();

        // Vehicle 2 sold nothing but already serves the busy route
        assert!(plan_reroutes(&policy(50), &vehicles, &sales).is_empty());
    }

    #[tokio::test]
    async fn test_missing_policy_aborts() {
        let store = Arc::new(MemoryStore::new());
        store.add_vehicle(vehicle(1, "Hanif", Some(ROUTE_A)));

        let result = rebalancer(store).run_at(now()).await;
        assert!(matches!(result, Err(CoreError::ConfigMissing(_))));
    }

    /// Delegates to the memory store but refuses route writes for one vehicle
    struct FlakyNetwork {
        inner: Arc<MemoryStore>,
        broken: VehicleId,
    }

    #[async_trait]
    impl NetworkRepository for FlakyNetwork {
        async fn load_network(&self) -> CoreResult<NetworkCatalog> {
            self.inner.load_network().await
        }
        async fn price_for(&self, stop1: &str, stop2: &str, category: &str) -> CoreResult<PriceEntry> {
            self.inner.price_for(stop1, stop2, category).await
        }
        async fn list_prices(&self) -> CoreResult<Vec<PriceEntry>> {
            self.inner.list_prices().await
        }
        async fn save_price(&self, entry: &PriceEntry) -> CoreResult<()> {
            self.inner.save_price(entry).await
        }
        async fn get_vehicle(&self, id: VehicleId) -> CoreResult<Option<Vehicle>> {
            self.inner.get_vehicle(id).await
        }
        async fn list_vehicles(&self) -> CoreResult<Vec<Vehicle>> {
            self.inner.list_vehicles().await
        }
        async fn assign_route(&self, vehicle_id: VehicleId, route_id: RouteId) -> CoreResult<()> {
            if vehicle_id == self.broken {
                return Err(CoreError::Storage("connection reset".into()));
            }
            self.inner.assign_route(vehicle_id, route_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.add_vehicle(vehicle(1, "Hanif", Some(ROUTE_A)));
        store.add_vehicle(vehicle(2, "Shohagh", Some(ROUTE_A)));
        store.add_vehicle(vehicle(3, "Green Line", Some(ROUTE_B)));
        store.set_capacity_policy(Some(policy(5)));
        for _ in 0..60 {
            sale(&store, 3, TRIP, 4, days_ago(2));
        }

        let network = Arc::new(FlakyNetwork { inner: store.clone(), broken: 1 });
        let rebalancer = CapacityRebalancer::new(network, store.clone(), store.clone(), Arc::new(LogEventPublisher::new()));
        let audit = rebalancer.run_at(now()).await.unwrap();

        assert_eq!(audit, vec![record(2, "Shohagh", Some(ROUTE_A), ROUTE_B)]);
        assert_eq!(store.get_vehicle(1).await.unwrap().unwrap().route_id, Some(ROUTE_A));
        assert_eq!(store.get_vehicle(2).await.unwrap().unwrap().route_id, Some(ROUTE_B));
    }
}
