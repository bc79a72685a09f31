use chrono::{DateTime, Duration, Utc};
use coachline_catalog::{DemandThresholds, PriceEntry, PricingEngine};
use coachline_core::events::emit;
use coachline_core::repository::{EventPublisher, NetworkRepository, PolicyRepository, SalesFeed};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::models::events::{topics, PriceAdjustedEvent};
use coachline_shared::SaleRecord;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::DEFAULT_WINDOW_DAYS;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceChange {
    pub stop1: String,
    pub stop2: String,
    pub category: String,
    pub old_price: i64,
    pub new_price: i64,
    pub seats_sold: u32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PriceAdjustmentReport {
    pub evaluated: usize,
    pub updated: Vec<PriceChange>,
    /// Unchanged, either settled or below the one-unit step
    pub skipped: usize,
    /// Entries whose write failed
    pub failed: usize,
}

/// Monthly repricing of every price entry from trailing sales
pub struct PriceAdjuster {
    network: Arc<dyn NetworkRepository>,
    policies: Arc<dyn PolicyRepository>,
    sales: Arc<dyn SalesFeed>,
    events: Arc<dyn EventPublisher>,
    thresholds: DemandThresholds,
    window: Duration,
}

impl PriceAdjuster {
    pub fn new(
        network: Arc<dyn NetworkRepository>,
        policies: Arc<dyn PolicyRepository>,
        sales: Arc<dyn SalesFeed>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            network,
            policies,
            sales,
            events,
            thresholds: DemandThresholds::default(),
            window: Duration::days(DEFAULT_WINDOW_DAYS),
        }
    }

    pub fn with_thresholds(mut self, thresholds: DemandThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window = Duration::days(days);
        self
    }

    pub async fn run(&self) -> CoreResult<PriceAdjustmentReport> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> CoreResult<PriceAdjustmentReport> {
        // 1. Policy is mandatory; never guess bounds
        let policy = self
            .policies
            .pricing_policy()
            .await?
            .ok_or_else(|| CoreError::ConfigMissing("pricing policy".to_string()))?;
        let engine = PricingEngine::new(policy, self.thresholds);

        // 2. Booked sales inside the trailing window
        let since = now - self.window;
        let sales: Vec<SaleRecord> = self
            .sales
            .sales_since(since)
            .await?
            .into_iter()
            .filter(|s| s.is_booked() && s.created_at >= since && s.created_at <= now)
            .collect();

        let entries = self.network.list_prices().await?;
        let mut report = PriceAdjustmentReport::default();

        for entry in entries {
            report.evaluated += 1;

            let matching: Vec<&SaleRecord> = sales
                .iter()
                .filter(|s| entry.matches_sale(&s.source, &s.destination, &s.category))
                .collect();

            // An entry adjusted in this window with no sale since is already settled:
            // no demand move, but it still has to sit inside the current bounds
            let settled = entry
                .adjusted_at
                .is_some_and(|adjusted_at| adjusted_at >= since && !matching.iter().any(|s| s.created_at > adjusted_at));

            let seats_sold: u32 = matching.iter().map(|s| s.seat_count).sum();
            let new_price = if settled {
                engine.clamp(entry.price)
            } else {
                engine.calculate_new_price(entry.price, seats_sold)
            };
            if !PricingEngine::is_significant(entry.price, new_price) {
                report.skipped += 1;
                continue;
            }

            let updated = PriceEntry {
                price: new_price,
                adjusted_at: Some(now),
                ..entry.clone()
            };

            match self.network.save_price(&updated).await {
                Ok(()) => {
                    info!(
                        "Price {} -> {} [{}]: {} -> {} ({} seats sold)",
                        entry.stop1, entry.stop2, entry.category, entry.price, new_price, seats_sold
                    );
                    let event = PriceAdjustedEvent {
                        stop1: entry.stop1.clone(),
                        stop2: entry.stop2.clone(),
                        category: entry.category.clone(),
                        old_price: entry.price,
                        new_price,
                        seats_sold,
                        timestamp: now.timestamp(),
                    };
                    let key = format!("{}:{}:{}", entry.stop1, entry.stop2, entry.category);
                    emit(self.events.as_ref(), topics::PRICE_ADJUSTED, &key, &event).await;

                    report.updated.push(PriceChange {
                        stop1: entry.stop1,
                        stop2: entry.stop2,
                        category: entry.category,
                        old_price: entry.price,
                        new_price,
                        seats_sold,
                    });
                }
                Err(e) => {
                    error!("Failed to update price {} -> {} [{}]: {}", entry.stop1, entry.stop2, entry.category, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Price adjustment done: {} evaluated, {} updated, {} skipped, {} failed",
            report.evaluated,
            report.updated.len(),
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
