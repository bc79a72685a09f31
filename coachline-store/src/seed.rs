use coachline_catalog::{CapacityPolicy, DurationEntry, PriceEntry, PricingPolicy, Route, Vehicle};
use coachline_core::{CoreError, CoreResult};
use serde::Deserialize;
use std::path::Path;

/// Network fixture loaded into the in-memory backend at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkSeed {
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub prices: Vec<PriceEntry>,
    #[serde(default)]
    pub durations: Vec<DurationEntry>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub pricing_policy: Option<PricingPolicy>,
    #[serde(default)]
    pub capacity_policy: Option<CapacityPolicy>,
}

impl NetworkSeed {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidInput(format!("invalid seed: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Storage(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use coachline_core::repository::NetworkRepository;

    const SEED: &str = r#"
    {
        "routes": [{ "id": 1, "stops": ["Dhaka", "Comilla", "Chittagong"] }],
        "prices": [{ "stop1": "Dhaka", "stop2": "Chittagong", "category": "AC", "price": 1100, "adjusted_at": null }],
        "durations": [
            { "stop1": "Dhaka", "stop2": "Comilla", "minutes": 120 },
            { "stop1": "Comilla", "stop2": "Chittagong", "minutes": 180 }
        ],
        "vehicles": [{
            "id": 1,
            "operator_name": "Green Line",
            "license_no": "DHA-KA-11-0001",
            "category": "AC",
            "base_departure": "07:30:00",
            "route_id": 1,
            "seat_layout": { "id": 1, "name": "AC 2+1", "category": "AC", "grid": [["A1", "", "A2", "A3"]] }
        }],
        "pricing_policy": { "min_price": 200, "max_price": 5000, "increase_percent": 15.0, "decrease_percent": 10.0 }
    }
    "#;

    #[tokio::test]
    async fn test_seed_loads_into_memory_store() {
        let seed = NetworkSeed::from_json(SEED).unwrap();
        assert!(seed.capacity_policy.is_none());

        let store = MemoryStore::from_seed(seed).unwrap();
        let catalog = store.load_network().await.unwrap();
        assert_eq!(catalog.price_for("Chittagong", "Dhaka", "ac"), Ok(1100));
        assert_eq!(store.list_vehicles().await.unwrap()[0].seat_layout.seat_count(), 3);
    }

    #[test]
    fn test_seed_rejects_invalid_route() {
        let seed = NetworkSeed::from_json(r#"{ "routes": [{ "id": 9, "stops": ["Dhaka"] }] }"#).unwrap();
        assert!(matches!(MemoryStore::from_seed(seed), Err(CoreError::InvalidInput(_))));
    }
}
