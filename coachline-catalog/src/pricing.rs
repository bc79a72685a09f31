use serde::{Deserialize, Serialize};

use crate::policy::PricingPolicy;

/// Sales volumes that trigger a price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandThresholds {
    /// Seats sold at or above this raise the price
    pub upper: u32,
    /// Seats sold at or below this lower the price
    pub lower: u32,
}

impl Default for DemandThresholds {
    fn default() -> Self {
        Self { upper: 100, lower: 20 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandSignal {
    High,
    Normal,
    Low,
}

/// Threshold-driven price calculation
pub struct PricingEngine {
    policy: PricingPolicy,
    thresholds: DemandThresholds,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy, thresholds: DemandThresholds) -> Self {
        Self { policy, thresholds }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn classify(&self, seats_sold: u32) -> DemandSignal {
        if seats_sold >= self.thresholds.upper {
            DemandSignal::High
        } else if seats_sold <= self.thresholds.lower {
            DemandSignal::Low
        } else {
            DemandSignal::Normal
        }
    }

    /// New price for a trailing sales volume, clamped to the policy bounds
    /// and rounded to a whole unit
    pub fn calculate_new_price(&self, current_price: i64, seats_sold: u32) -> i64 {
        let factor = match self.classify(seats_sold) {
            DemandSignal::High => 1.0 + self.policy.increase_percent / 100.0,
            DemandSignal::Low => 1.0 - self.policy.decrease_percent / 100.0,
            DemandSignal::Normal => 1.0,
        };

        let adjusted = current_price as f64 * factor;

        adjusted
            .max(self.policy.min_price as f64)
            .min(self.policy.max_price as f64)
            .round() as i64
    }

    /// Current price pulled inside the policy bounds, without any demand move
    pub fn clamp(&self, price: i64) -> i64 {
        price.max(self.policy.min_price).min(self.policy.max_price)
    }

    /// Changes smaller than one unit are churn
    pub fn is_significant(old_price: i64, new_price: i64) -> bool {
        (new_price - old_price).abs() >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new(
            PricingPolicy {
                min_price: 200,
                max_price: 5000,
                increase_percent: 15.0,
                decrease_percent: 10.0,
            },
            DemandThresholds::default(),
        )
    }

    #[test]
    fn test_high_demand_raises_price() {
        assert_eq!(engine().calculate_new_price(1000, 150), 1150);
        assert_eq!(engine().calculate_new_price(1000, 100), 1150);
    }

    #[test]
    fn test_low_demand_lowers_price() {
        assert_eq!(engine().calculate_new_price(1000, 5), 900);
        assert_eq!(engine().calculate_new_price(1000, 20), 900);
    }

    #[test]
    fn test_between_thresholds_unchanged() {
        assert_eq!(engine().calculate_new_price(1000, 50), 1000);
        assert!(!PricingEngine::is_significant(1000, 1000));
    }

    #[test]
    fn test_result_always_within_bounds() {
        let engine = engine();
        for price in [0, 150, 210, 1000, 4900, 5000, 90_000] {
            for sold in [0, 20, 21, 99, 100, 10_000] {
                let new_price = engine.calculate_new_price(price, sold);
                assert!((200..=5000).contains(&new_price), "{} sold {} -> {}", price, sold, new_price);
            }
        }
    }

    #[test]
    fn test_clamp_only_applies_bounds() {
        let engine = engine();
        assert_eq!(engine.clamp(7000), 5000);
        assert_eq!(engine.clamp(150), 200);
        assert_eq!(engine.clamp(1150), 1150);
    }

    #[test]
    fn test_rounds_to_whole_units() {
        // 333 * 1.15 = 382.95
        assert_eq!(engine().calculate_new_price(333, 500), 383);
    }
}
