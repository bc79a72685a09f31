use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use coachline_catalog::{CapacityPolicy, InventoryKey, NetworkCatalog, PriceEntry, PricingPolicy, SeatInventory, Vehicle};
use coachline_shared::{RouteId, SaleRecord, Ticket, VehicleId};
use uuid::Uuid;

use crate::CoreResult;

/// Routes, prices, durations and the vehicle fleet
#[async_trait]
pub trait NetworkRepository: Send + Sync {
    /// Fresh snapshot of routes, price entries and segment durations
    async fn load_network(&self) -> CoreResult<NetworkCatalog>;

    /// Entry for the unordered stop pair and category, matched case-insensitively.
    /// The returned entry carries the catalog's own spelling of the stops.
    async fn price_for(&self, stop1: &str, stop2: &str, category: &str) -> CoreResult<PriceEntry>;

    async fn list_prices(&self) -> CoreResult<Vec<PriceEntry>>;

    /// Upsert keyed by (stop1, stop2, category)
    async fn save_price(&self, entry: &PriceEntry) -> CoreResult<()>;

    async fn get_vehicle(&self, id: VehicleId) -> CoreResult<Option<Vehicle>>;

    async fn list_vehicles(&self) -> CoreResult<Vec<Vehicle>>;

    async fn assign_route(&self, vehicle_id: VehicleId, route_id: RouteId) -> CoreResult<()>;
}

/// Seat inventories and the tickets that reference them
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn get_or_create_inventory(&self, vehicle: &Vehicle, journey_date: NaiveDate) -> CoreResult<SeatInventory>;

    async fn find_inventory(&self, key: InventoryKey) -> CoreResult<Option<SeatInventory>>;

    /// Reserves the ticket's seats and stores the ticket as one unit.
    /// Nothing is written when any seat is taken.
    async fn commit_booking(&self, ticket: &Ticket) -> CoreResult<SeatInventory>;

    /// Releases the ticket's seats and marks it cancelled as one unit
    async fn commit_cancellation(&self, ticket_id: Uuid) -> CoreResult<Ticket>;

    async fn get_ticket(&self, id: Uuid) -> CoreResult<Option<Ticket>>;

    async fn find_ticket_by_code(&self, code: &str) -> CoreResult<Option<Ticket>>;

    /// Newest first
    async fn tickets_for_user(&self, user_id: &str) -> CoreResult<Vec<Ticket>>;

    /// Deletes inventories for journey dates strictly before `date`
    async fn purge_inventory_before(&self, date: NaiveDate) -> CoreResult<u64>;
}

/// Historical sales consumed by the periodic jobs
#[async_trait]
pub trait SalesFeed: Send + Sync {
    /// Every sale created at or after `since`, whatever its status
    async fn sales_since(&self, since: DateTime<Utc>) -> CoreResult<Vec<SaleRecord>>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn pricing_policy(&self) -> CoreResult<Option<PricingPolicy>>;
    async fn save_pricing_policy(&self, policy: &PricingPolicy) -> CoreResult<()>;
    async fn capacity_policy(&self) -> CoreResult<Option<CapacityPolicy>>;
    async fn save_capacity_policy(&self, policy: &CapacityPolicy) -> CoreResult<()>;
}

/// Run-once guard for scheduled jobs
#[async_trait]
pub trait JobLock: Send + Sync {
    /// False when another holder owns the lock
    async fn try_acquire(&self, job: &str, holder: &str, ttl_seconds: u64) -> CoreResult<bool>;

    /// Only releases when `holder` still owns the lock
    async fn release(&self, job: &str, holder: &str) -> CoreResult<()>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> CoreResult<()>;
}
