pub mod price_adjuster;
pub mod rebalancer;
pub mod housekeeping;
pub mod report;
pub mod runner;

#[cfg(test)]
mod fixtures;

pub use price_adjuster::{PriceAdjuster, PriceAdjustmentReport, PriceChange};
pub use rebalancer::{CapacityRebalancer, RerouteRecord};
pub use housekeeping::InventoryCleanup;
pub use report::{RouteSales, SalesReporter};
pub use runner::{jobs, JobRunner};

/// Trailing window used by the demand-driven jobs
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
