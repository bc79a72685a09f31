use serde::{Deserialize, Serialize};

/// Bounds and step sizes for the monthly price adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub min_price: i64,
    pub max_price: i64,
    pub increase_percent: f64,
    pub decrease_percent: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            min_price: 200,
            max_price: 5000,
            increase_percent: 15.0,
            decrease_percent: 10.0,
        }
    }
}

impl PricingPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.min_price < 0 || self.min_price > self.max_price {
            return Err(PolicyError::Invalid(format!(
                "price bounds [{}, {}] are not a valid range",
                self.min_price, self.max_price
            )));
        }
        if !(0.0..=1000.0).contains(&self.increase_percent) {
            return Err(PolicyError::Invalid(format!(
                "increase_percent {} out of range",
                self.increase_percent
            )));
        }
        if !(0.0..=100.0).contains(&self.decrease_percent) {
            return Err(PolicyError::Invalid(format!(
                "decrease_percent {} out of range",
                self.decrease_percent
            )));
        }
        Ok(())
    }
}

/// Knobs for the capacity rebalancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    /// Upper bound on vehicles moved per run
    pub max_reroutes_per_run: u32,
    /// Vehicles selling at most this many seats are underperforming
    pub underperform_threshold: u32,
    /// Routes selling at least this many seats are high demand
    pub high_demand_threshold: u32,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            max_reroutes_per_run: 50,
            underperform_threshold: 20,
            high_demand_threshold: 200,
        }
    }
}

impl CapacityPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.underperform_threshold >= self.high_demand_threshold {
            return Err(PolicyError::Invalid(format!(
                "underperform_threshold {} must be below high_demand_threshold {}",
                self.underperform_threshold, self.high_demand_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PolicyError {
    #[error("Invalid policy: {0}")]
    Invalid(String),
}
