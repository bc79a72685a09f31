pub mod network;
pub mod policy;
pub mod pricing;
pub mod inventory;

pub use network::{CatalogError, DurationEntry, NetworkCatalog, PriceEntry, Route, SeatLayout, StopPair, Vehicle};
pub use policy::{CapacityPolicy, PolicyError, PricingPolicy};
pub use pricing::{DemandSignal, DemandThresholds, PricingEngine};
pub use inventory::{InventoryError, InventoryKey, SeatInventory, SeatLedger};
