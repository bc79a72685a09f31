use chrono::{NaiveDate, NaiveTime};
use coachline_shared::{RouteId, VehicleId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct TripSearchRequest {
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    /// Inclusive
    #[serde(default)]
    pub min_budget: Option<i64>,
    /// Inclusive
    #[serde(default)]
    pub max_budget: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripOption {
    pub vehicle_id: VehicleId,
    pub route_id: RouteId,
    pub operator_name: String,
    pub license_no: String,
    pub category: String,
    pub source: String,
    pub destination: String,
    /// Departure at `source`, not at the first stop
    pub departure_time: NaiveTime,
    /// Day of `departure_time`; after the searched date when the run
    /// passes midnight before reaching `source`
    pub departure_date: NaiveDate,
    pub price: i64,
    pub available_seats: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_deserialization() {
        let json = r#"
            {
                "source": "Dhaka",
                "destination": "Chittagong",
                "date": "2025-07-07",
                "max_budget": 1200
            }
        "#;
        let req: TripSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.source, "Dhaka");
        assert_eq!(req.date, NaiveDate::from_ymd_opt(2025, 7, 7).unwrap());
        assert_eq!(req.category, None);
        assert_eq!(req.max_budget, Some(1200));
    }
}
