use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use coachline_catalog::{
    CapacityPolicy, CatalogError, DurationEntry, InventoryError, InventoryKey, NetworkCatalog, PriceEntry,
    PricingPolicy, Route, SeatInventory, SeatLedger, StopPair, Vehicle,
};
use coachline_core::repository::{
    JobLock, NetworkRepository, PolicyRepository, ReservationRepository, SalesFeed,
};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::{RouteId, SaleRecord, Ticket, VehicleId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::seed::NetworkSeed;

#[derive(Default)]
struct NetworkState {
    routes: BTreeMap<RouteId, Route>,
    prices: Vec<PriceEntry>,
    durations: Vec<DurationEntry>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
}

/// Process-local implementation of every store port.
///
/// Seat state lives in a [`SeatLedger`]; a booking inserts its ticket while
/// still holding the per-inventory lock, so a reader never sees seats without
/// a ticket or the reverse. Lock order is always inventory, then tickets.
pub struct MemoryStore {
    network: RwLock<NetworkState>,
    ledger: SeatLedger,
    tickets: RwLock<HashMap<Uuid, Ticket>>,
    pricing_policy: RwLock<Option<PricingPolicy>>,
    capacity_policy: RwLock<Option<CapacityPolicy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            network: RwLock::new(NetworkState::default()),
            ledger: SeatLedger::new(),
            tickets: RwLock::new(HashMap::new()),
            pricing_policy: RwLock::new(None),
            capacity_policy: RwLock::new(None),
        }
    }

    pub fn from_seed(seed: NetworkSeed) -> CoreResult<Self> {
        let store = Self::new();
        for route in seed.routes {
            store.add_route(Route::new(route.id, route.stops)?);
        }
        for entry in seed.prices {
            store.add_price(entry);
        }
        for entry in seed.durations {
            store.add_duration(entry);
        }
        for vehicle in seed.vehicles {
            store.add_vehicle(vehicle);
        }
        store.set_pricing_policy(seed.pricing_policy);
        store.set_capacity_policy(seed.capacity_policy);
        Ok(store)
    }

    pub fn add_route(&self, route: Route) {
        write(&self.network).routes.insert(route.id, route);
    }

    /// Replaces an entry with the same literal (stop1, stop2, category)
    pub fn add_price(&self, entry: PriceEntry) {
        let mut network = write(&self.network);
        match network
            .prices
            .iter_mut()
            .find(|p| p.stop1 == entry.stop1 && p.stop2 == entry.stop2 && p.category == entry.category)
        {
            Some(existing) => *existing = entry,
            None => network.prices.push(entry),
        }
    }

    pub fn add_duration(&self, entry: DurationEntry) {
        write(&self.network).durations.push(entry);
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        write(&self.network).vehicles.insert(vehicle.id, vehicle);
    }

    /// Stores a ticket as-is, without touching any inventory
    pub fn add_ticket(&self, ticket: Ticket) {
        write(&self.tickets).insert(ticket.id, ticket);
    }

    pub fn set_pricing_policy(&self, policy: Option<PricingPolicy>) {
        *write(&self.pricing_policy) = policy;
    }

    pub fn set_capacity_policy(&self, policy: Option<CapacityPolicy>) {
        *write(&self.capacity_policy) = policy;
    }

    fn mark_cancelled(&self, ticket_id: Uuid) -> CoreResult<Ticket> {
        let mut tickets = write(&self.tickets);
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| CoreError::NotFound(format!("ticket {}", ticket_id)))?;
        if !ticket.is_booked() {
            return Err(CoreError::AlreadyCancelled(ticket_id));
        }
        ticket.cancel();
        Ok(ticket.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl NetworkRepository for MemoryStore {
    async fn load_network(&self) -> CoreResult<NetworkCatalog> {
        let network = read(&self.network);
        Ok(NetworkCatalog::new(
            network.routes.values().cloned().collect(),
            network.prices.clone(),
            network.durations.clone(),
        ))
    }

    async fn price_for(&self, stop1: &str, stop2: &str, category: &str) -> CoreResult<PriceEntry> {
        let pair = StopPair::new(stop1, stop2);
        let category_key = category.to_lowercase();
        read(&self.network)
            .prices
            .iter()
            .find(|p| StopPair::new(&p.stop1, &p.stop2) == pair && p.category.to_lowercase() == category_key)
            .cloned()
            .ok_or_else(|| {
                CatalogError::PriceUnavailable {
                    origin: stop1.to_string(),
                    destination: stop2.to_string(),
                    category: category.to_string(),
                }
                .into()
            })
    }

    async fn list_prices(&self) -> CoreResult<Vec<PriceEntry>> {
        Ok(read(&self.network).prices.clone())
    }

    async fn save_price(&self, entry: &PriceEntry) -> CoreResult<()> {
        self.add_price(entry.clone());
        Ok(())
    }

    async fn get_vehicle(&self, id: VehicleId) -> CoreResult<Option<Vehicle>> {
        Ok(read(&self.network).vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> CoreResult<Vec<Vehicle>> {
        Ok(read(&self.network).vehicles.values().cloned().collect())
    }

    async fn assign_route(&self, vehicle_id: VehicleId, route_id: RouteId) -> CoreResult<()> {
        let mut network = write(&self.network);
        let vehicle = network
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| CoreError::NotFound(format!("vehicle {}", vehicle_id)))?;
        vehicle.route_id = Some(route_id);
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn get_or_create_inventory(&self, vehicle: &Vehicle, journey_date: NaiveDate) -> CoreResult<SeatInventory> {
        Ok(self.ledger.get_or_create(vehicle, journey_date))
    }

    async fn find_inventory(&self, key: InventoryKey) -> CoreResult<Option<SeatInventory>> {
        Ok(self.ledger.snapshot(&key))
    }

    async fn commit_booking(&self, ticket: &Ticket) -> CoreResult<SeatInventory> {
        let key = InventoryKey::new(ticket.vehicle_id, ticket.journey_date);
        self.ledger.with_inventory(&key, |inventory| -> CoreResult<SeatInventory> {
            inventory.try_reserve(&ticket.seats, ticket.id)?;
            write(&self.tickets).insert(ticket.id, ticket.clone());
            Ok(inventory.clone())
        })?
    }

    async fn commit_cancellation(&self, ticket_id: Uuid) -> CoreResult<Ticket> {
        let ticket = read(&self.tickets)
            .get(&ticket_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("ticket {}", ticket_id)))?;
        if !ticket.is_booked() {
            return Err(CoreError::AlreadyCancelled(ticket_id));
        }

        let key = InventoryKey::new(ticket.vehicle_id, ticket.journey_date);
        let released = self.ledger.with_inventory(&key, |inventory| -> CoreResult<Ticket> {
            let cancelled = self.mark_cancelled(ticket_id)?;
            let held: Vec<String> = cancelled
                .seats
                .iter()
                .filter(|seat| inventory.holder_of(seat) == Some(ticket_id))
                .cloned()
                .collect();
            inventory.release(&held);
            Ok(cancelled)
        });

        match released {
            Ok(result) => result,
            // Inventory already purged; only the ticket changes
            Err(InventoryError::NotFound { .. }) => self.mark_cancelled(ticket_id),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_ticket(&self, id: Uuid) -> CoreResult<Option<Ticket>> {
        Ok(read(&self.tickets).get(&id).cloned())
    }

    async fn find_ticket_by_code(&self, code: &str) -> CoreResult<Option<Ticket>> {
        Ok(read(&self.tickets).values().find(|t| t.code == code).cloned())
    }

    async fn tickets_for_user(&self, user_id: &str) -> CoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = read(&self.tickets)
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn purge_inventory_before(&self, date: NaiveDate) -> CoreResult<u64> {
        Ok(self.ledger.purge_before(date) as u64)
    }
}

#[async_trait]
impl SalesFeed for MemoryStore {
    async fn sales_since(&self, since: DateTime<Utc>) -> CoreResult<Vec<SaleRecord>> {
        let mut sales: Vec<SaleRecord> = read(&self.tickets)
            .values()
            .filter(|t| t.created_at >= since)
            .map(Ticket::sale_record)
            .collect();
        sales.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sales)
    }
}

#[async_trait]
impl PolicyRepository for MemoryStore {
    async fn pricing_policy(&self) -> CoreResult<Option<PricingPolicy>> {
        Ok(read(&self.pricing_policy).clone())
    }

    async fn save_pricing_policy(&self, policy: &PricingPolicy) -> CoreResult<()> {
        policy.validate()?;
        self.set_pricing_policy(Some(policy.clone()));
        Ok(())
    }

    async fn capacity_policy(&self) -> CoreResult<Option<CapacityPolicy>> {
        Ok(read(&self.capacity_policy).clone())
    }

    async fn save_capacity_policy(&self, policy: &CapacityPolicy) -> CoreResult<()> {
        policy.validate()?;
        self.set_capacity_policy(Some(policy.clone()));
        Ok(())
    }
}

/// Job lock for a single node; the Redis lock covers a whole deployment
pub struct LocalJobLock {
    held: Mutex<HashMap<String, (String, Instant)>>,
}

impl LocalJobLock {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for LocalJobLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobLock for LocalJobLock {
    async fn try_acquire(&self, job: &str, holder: &str, ttl_seconds: u64) -> CoreResult<bool> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if let Some((_, expires)) = held.get(job) {
            if *expires > now {
                return Ok(false);
            }
        }
        held.insert(job.to_string(), (holder.to_string(), now + Duration::from_secs(ttl_seconds)));
        Ok(true)
    }

    async fn release(&self, job: &str, holder: &str) -> CoreResult<()> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.get(job).is_some_and(|(owner, _)| owner == holder) {
            held.remove(job);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use coachline_catalog::SeatLayout;
    use coachline_shared::TicketStatus;
    use std::sync::Arc;

    fn vehicle() -> Vehicle {
        Vehicle {
            id: 5,
            operator_name: "Shyamoli".into(),
            license_no: "DHA-5".into(),
            category: "Non-AC".into(),
            base_departure: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            route_id: Some(1),
            seat_layout: SeatLayout {
                id: 2,
                name: "Non-AC 2+2".into(),
                category: "Non-AC".into(),
                grid: vec![vec!["A1".into(), "A2".into(), "".into(), "A3".into(), "A4".into()]],
            },
        }
    }

    fn ticket(seats: &[&str]) -> Ticket {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            code: Ticket::generate_code(5, date),
            user_id: "u1".into(),
            vehicle_id: 5,
            journey_date: date,
            seats: seats.iter().map(|s| s.to_string()).collect(),
            source: "Dhaka".into(),
            destination: "Rajshahi".into(),
            category: "Non-AC".into(),
            total_price: 700,
            departure_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            created_at: Utc::now(),
            status: TicketStatus::Booked,
        }
    }

    #[tokio::test]
    async fn test_commit_booking_is_all_or_nothing() {
        let store = MemoryStore::new();
        let first = ticket(&["A1", "A2"]);
        store.get_or_create_inventory(&vehicle(), first.journey_date).await.unwrap();

        let inventory = store.commit_booking(&first).await.unwrap();
        assert_eq!(inventory.available_seats, 2);

        let clash = ticket(&["A3", "A2"]);
        let result = store.commit_booking(&clash).await;
        assert!(matches!(result, Err(CoreError::SeatConflict(ref s)) if s == "A2"));
        assert!(store.get_ticket(clash.id).await.unwrap().is_none());

        let inventory = store.find_inventory(InventoryKey::new(5, first.journey_date)).await.unwrap().unwrap();
        assert!(!inventory.is_booked("A3"));
        assert!(inventory.is_consistent());
    }

    #[tokio::test]
    async fn test_commit_booking_needs_inventory() {
        let store = MemoryStore::new();
        let result = store.commit_booking(&ticket(&["A1"])).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancellation_after_purge_still_cancels() {
        let store = MemoryStore::new();
        let booked = ticket(&["A4"]);
        store.get_or_create_inventory(&vehicle(), booked.journey_date).await.unwrap();
        store.commit_booking(&booked).await.unwrap();
        store.purge_inventory_before(NaiveDate::from_ymd_opt(2025, 9, 2).unwrap()).await.unwrap();

        let cancelled = store.commit_cancellation(booked.id).await.unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert!(matches!(
            store.commit_cancellation(booked.id).await,
            Err(CoreError::AlreadyCancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_cancel_releases_once() {
        let store = Arc::new(MemoryStore::new());
        let booked = ticket(&["A1", "A2"]);
        store.get_or_create_inventory(&vehicle(), booked.journey_date).await.unwrap();
        store.commit_booking(&booked).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let id = booked.id;
                tokio::spawn(async move { store.commit_cancellation(id).await })
            })
            .collect();
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }

        assert_eq!(ok, 1);
        let inventory = store.find_inventory(InventoryKey::new(5, booked.journey_date)).await.unwrap().unwrap();
        assert_eq!(inventory.available_seats, 4);
        assert!(inventory.is_consistent());
    }

    #[tokio::test]
    async fn test_price_lookup_and_upsert() {
        let store = MemoryStore::new();
        store.add_price(PriceEntry::new("Dhaka", "Rajshahi", "Non-AC", 700));

        let entry = store.price_for("rajshahi", "dhaka", "non-ac").await.unwrap();
        assert_eq!(entry.price, 700);
        assert_eq!((entry.stop1.as_str(), entry.stop2.as_str()), ("Dhaka", "Rajshahi"));
        assert!(matches!(
            store.price_for("Dhaka", "Rajshahi", "AC").await,
            Err(CoreError::PriceUnavailable { .. })
        ));

        let mut entry = PriceEntry::new("Dhaka", "Rajshahi", "Non-AC", 770);
        entry.adjusted_at = Some(Utc::now());
        store.save_price(&entry).await.unwrap();
        assert_eq!(store.list_prices().await.unwrap().len(), 1);
        assert_eq!(store.price_for("Dhaka", "Rajshahi", "Non-AC").await.unwrap().price, 770);
    }

    #[tokio::test]
    async fn test_policy_round_trip_validates() {
        let store = MemoryStore::new();
        assert!(store.pricing_policy().await.unwrap().is_none());

        let bad = PricingPolicy { min_price: 10, max_price: 5, ..Default::default() };
        assert!(matches!(store.save_pricing_policy(&bad).await, Err(CoreError::InvalidInput(_))));

        store.save_capacity_policy(&CapacityPolicy::default()).await.unwrap();
        assert_eq!(store.capacity_policy().await.unwrap(), Some(CapacityPolicy::default()));
    }

    #[tokio::test]
    async fn test_local_job_lock() {
        let lock = LocalJobLock::new();
        assert!(lock.try_acquire("rebalance", "a", 60).await.unwrap());
        assert!(!lock.try_acquire("rebalance", "b", 60).await.unwrap());
        assert!(!lock.try_acquire("rebalance", "a", 60).await.unwrap());

        // Only the owner releases
        lock.release("rebalance", "b").await.unwrap();
        assert!(!lock.try_acquire("rebalance", "b", 60).await.unwrap());
        lock.release("rebalance", "a").await.unwrap();
        assert!(lock.try_acquire("rebalance", "b", 60).await.unwrap());

        // Expired locks can be taken over
        assert!(lock.try_acquire("cleanup", "a", 0).await.unwrap());
        assert!(lock.try_acquire("cleanup", "b", 60).await.unwrap());
    }
}
