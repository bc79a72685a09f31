use chrono::{DateTime, Duration, NaiveTime, Utc};
use coachline_shared::{RouteId, VehicleId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ordered stop sequence travelled by a vehicle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub stops: Vec<String>,
}

impl Route {
    pub fn new(id: RouteId, stops: Vec<String>) -> Result<Self, CatalogError> {
        if stops.len() < 2 {
            return Err(CatalogError::InvalidRoute(format!(
                "route {} needs at least 2 stops, got {}",
                id,
                stops.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for stop in &stops {
            if !seen.insert(stop.as_str()) {
                return Err(CatalogError::InvalidRoute(format!(
                    "route {} visits {} more than once",
                    id, stop
                )));
            }
        }

        Ok(Self { id, stops })
    }

    pub fn position(&self, stop: &str) -> Option<usize> {
        self.stops.iter().position(|s| s == stop)
    }

    /// True when both stops are on the route and `from` comes first
    pub fn precedes(&self, from: &str, to: &str) -> bool {
        match (self.position(from), self.position(to)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

/// Named grid of seat labels; empty cells are aisles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatLayout {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub grid: Vec<Vec<String>>,
}

impl SeatLayout {
    pub fn seat_count(&self) -> u32 {
        self.labels().count() as u32
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.grid
            .iter()
            .flat_map(|row| row.iter())
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    pub fn contains(&self, label: &str) -> bool {
        !label.trim().is_empty() && self.labels().any(|l| l == label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub operator_name: String,
    pub license_no: String,
    pub category: String,
    /// Departure from the first stop of the assigned route
    pub base_departure: NaiveTime,
    pub route_id: Option<RouteId>,
    pub seat_layout: SeatLayout,
}

/// Unordered, case-insensitive pair of stop names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopPair(String, String);

impl StopPair {
    pub fn new(a: &str, b: &str) -> Self {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        if a <= b {
            StopPair(a, b)
        } else {
            StopPair(b, a)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceEntry {
    pub stop1: String,
    pub stop2: String,
    pub category: String,
    /// Whole currency units
    pub price: i64,
    pub adjusted_at: Option<DateTime<Utc>>,
}

impl PriceEntry {
    pub fn new(stop1: &str, stop2: &str, category: &str, price: i64) -> Self {
        Self {
            stop1: stop1.to_string(),
            stop2: stop2.to_string(),
            category: category.to_string(),
            price,
            adjusted_at: None,
        }
    }

    fn key(&self) -> (StopPair, String) {
        (StopPair::new(&self.stop1, &self.stop2), self.category.to_lowercase())
    }

    /// The entry's own spelling of (source, destination) for a trip starting
    /// at `source`, in either direction of the pair
    pub fn oriented_from(&self, source: &str) -> (String, String) {
        if self.stop2.eq_ignore_ascii_case(source.trim()) {
            (self.stop2.clone(), self.stop1.clone())
        } else {
            (self.stop1.clone(), self.stop2.clone())
        }
    }

    /// Literal, directional match used when attributing sales
    pub fn matches_sale(&self, source: &str, destination: &str, category: &str) -> bool {
        self.stop1 == source && self.stop2 == destination && self.category == category
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DurationEntry {
    pub stop1: String,
    pub stop2: String,
    pub minutes: u32,
}

/// Read-only snapshot of routes, prices and segment durations
#[derive(Debug, Clone, Default)]
pub struct NetworkCatalog {
    routes: BTreeMap<RouteId, Route>,
    prices: Vec<PriceEntry>,
    price_index: HashMap<(StopPair, String), i64>,
    durations: HashMap<StopPair, u32>,
}

impl NetworkCatalog {
    pub fn new(routes: Vec<Route>, prices: Vec<PriceEntry>, durations: Vec<DurationEntry>) -> Self {
        let mut price_index = HashMap::new();
        for entry in &prices {
            // First entry wins when both directions are stored
            price_index.entry(entry.key()).or_insert(entry.price);
        }

        let mut duration_index = HashMap::new();
        for entry in durations {
            duration_index
                .entry(StopPair::new(&entry.stop1, &entry.stop2))
                .or_insert(entry.minutes);
        }

        Self {
            routes: routes.into_iter().map(|r| (r.id, r)).collect(),
            prices,
            price_index,
            durations: duration_index,
        }
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn price_entries(&self) -> &[PriceEntry] {
        &self.prices
    }

    pub fn price_for(&self, stop1: &str, stop2: &str, category: &str) -> Result<i64, CatalogError> {
        self.price_index
            .get(&(StopPair::new(stop1, stop2), category.to_lowercase()))
            .copied()
            .ok_or_else(|| CatalogError::PriceUnavailable {
                origin: stop1.to_string(),
                destination: stop2.to_string(),
                category: category.to_string(),
            })
    }

    pub fn duration_between(&self, stop1: &str, stop2: &str) -> Result<u32, CatalogError> {
        self.durations
            .get(&StopPair::new(stop1, stop2))
            .copied()
            .ok_or_else(|| CatalogError::DurationUnavailable(stop1.to_string(), stop2.to_string()))
    }

    /// Routes on which `from` is visited before `to`
    pub fn routes_containing(&self, from: &str, to: &str) -> Vec<&Route> {
        self.routes.values().filter(|r| r.precedes(from, to)).collect()
    }

    /// Base departure plus the summed segment durations up to `stop`.
    /// Computed on every call; nothing is cached. Wraps past midnight, see
    /// [`NetworkCatalog::minutes_to_stop`] for the full offset.
    pub fn departure_time_at(&self, vehicle: &Vehicle, stop: &str) -> Result<NaiveTime, CatalogError> {
        let elapsed = self.minutes_to_stop(vehicle, stop)?;
        Ok(vehicle.base_departure + Duration::minutes(elapsed))
    }

    /// Minutes from the vehicle leaving its first stop until it reaches `stop`
    pub fn minutes_to_stop(&self, vehicle: &Vehicle, stop: &str) -> Result<i64, CatalogError> {
        let route_id = vehicle.route_id.ok_or(CatalogError::Unassigned(vehicle.id))?;
        let route = self
            .routes
            .get(&route_id)
            .ok_or(CatalogError::RouteNotFound(route_id))?;

        let index = route.position(stop).ok_or_else(|| CatalogError::StopNotOnRoute {
            stop: stop.to_string(),
            route_id,
        })?;

        let mut elapsed_minutes: i64 = 0;
        for segment in route.stops[..=index].windows(2) {
            let minutes = self
                .duration_between(&segment[0], &segment[1])
                .map_err(|_| CatalogError::MissingSegment {
                    from: segment[0].clone(),
                    to: segment[1].clone(),
                })?;
            elapsed_minutes += i64::from(minutes);
        }

        Ok(elapsed_minutes)
    }

    /// Every stop that appears in the price table, sorted
    pub fn stops(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .prices
            .iter()
            .flat_map(|p| [p.stop1.as_str(), p.stop2.as_str()])
            .collect();
        set.into_iter().map(String::from).collect()
    }

    /// Stops reachable from `source` according to the price table
    pub fn destinations_from(&self, source: &str) -> Vec<String> {
        let source = source.trim().to_lowercase();
        let mut set = BTreeSet::new();
        for entry in &self.prices {
            if entry.stop1.to_lowercase() == source {
                set.insert(entry.stop2.as_str());
            } else if entry.stop2.to_lowercase() == source {
                set.insert(entry.stop1.as_str());
            }
        }
        set.into_iter().map(String::from).collect()
    }

    /// Vehicles whose assigned route visits `from` before `to`
    pub fn vehicles_serving<'a>(&self, from: &str, to: &str, vehicles: &'a [Vehicle]) -> Vec<&'a Vehicle> {
        vehicles
            .iter()
            .filter(|v| {
                v.route_id
                    .and_then(|id| self.routes.get(&id))
                    .map(|r| r.precedes(from, to))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("No price for {origin} -> {destination} [{category}]")]
    PriceUnavailable {
        origin: String,
        destination: String,
        category: String,
    },

    #[error("No travel duration between {0} and {1}")]
    DurationUnavailable(String, String),

    #[error("Stop {stop} is not on route {route_id}")]
    StopNotOnRoute { stop: String, route_id: RouteId },

    #[error("Missing segment duration {from} -> {to}")]
    MissingSegment { from: String, to: String },

    #[error("Vehicle {0} has no route assigned")]
    Unassigned(VehicleId),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),
}
