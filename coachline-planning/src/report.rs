use chrono::{DateTime, Utc};
use coachline_core::repository::{NetworkRepository, SalesFeed};
use coachline_core::CoreResult;
use serde::Serialize;
use std::sync::Arc;

/// Booked sales attributed to one price entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSales {
    pub stop1: String,
    pub stop2: String,
    pub category: String,
    pub price: i64,
    pub tickets_sold: u64,
    pub seats_sold: u64,
    pub revenue: i64,
}

pub struct SalesReporter {
    network: Arc<dyn NetworkRepository>,
    sales: Arc<dyn SalesFeed>,
}

impl SalesReporter {
    pub fn new(network: Arc<dyn NetworkRepository>, sales: Arc<dyn SalesFeed>) -> Self {
        Self { network, sales }
    }

    /// One row per price entry, including entries with no sales
    pub async fn report(&self, since: DateTime<Utc>) -> CoreResult<Vec<RouteSales>> {
        let sales = self.sales.sales_since(since).await?;
        let entries = self.network.list_prices().await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut row = RouteSales {
                    stop1: entry.stop1.clone(),
                    stop2: entry.stop2.clone(),
                    category: entry.category.clone(),
                    price: entry.price,
                    tickets_sold: 0,
                    seats_sold: 0,
                    revenue: 0,
                };
                for sale in sales
                    .iter()
                    .filter(|s| s.is_booked() && entry.matches_sale(&s.source, &s.destination, &s.category))
                {
                    row.tickets_sold += 1;
                    row.seats_sold += u64::from(sale.seat_count);
                    row.revenue += sale.total_price;
                }
                row
            })
            .collect())
    }
}
