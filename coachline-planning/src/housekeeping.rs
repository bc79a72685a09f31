use chrono::{NaiveDate, Utc};
use coachline_core::repository::ReservationRepository;
use coachline_core::CoreResult;
use std::sync::Arc;
use tracing::info;

/// Daily removal of seat inventories for past journey dates
pub struct InventoryCleanup {
    reservations: Arc<dyn ReservationRepository>,
}

impl InventoryCleanup {
    pub fn new(reservations: Arc<dyn ReservationRepository>) -> Self {
        Self { reservations }
    }

    pub async fn run(&self) -> CoreResult<u64> {
        self.run_at(Utc::now().date_naive()).await
    }

    /// Tickets are kept; only the seat maps for dates before `today` go
    pub async fn run_at(&self, today: NaiveDate) -> CoreResult<u64> {
        let removed = self.reservations.purge_inventory_before(today).await?;
        info!("Inventory cleanup: removed {} records before {}", removed, today);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::vehicle;
    use coachline_catalog::InventoryKey;
    use coachline_store::memory::MemoryStore;

    #[tokio::test]
    async fn test_removes_only_past_dates() {
        let store = Arc::new(MemoryStore::new());
        let v = vehicle(1, "Hanif", Some(1));
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        for day in [29, 30, 31] {
            let date = NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
            store.get_or_create_inventory(&v, date).await.unwrap();
        }
        store.get_or_create_inventory(&v, today).await.unwrap();

        let cleanup = InventoryCleanup::new(store.clone());
        assert_eq!(cleanup.run_at(today).await.unwrap(), 3);
        assert!(store.find_inventory(InventoryKey::new(1, today)).await.unwrap().is_some());
        assert_eq!(cleanup.run_at(today).await.unwrap(), 0);
    }
}
