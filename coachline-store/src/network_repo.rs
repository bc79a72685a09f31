use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use coachline_catalog::{
    CapacityPolicy, CatalogError, DurationEntry, NetworkCatalog, PriceEntry, PricingPolicy, Route, SeatLayout, Vehicle,
};
use coachline_core::repository::{NetworkRepository, PolicyRepository};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::{RouteId, VehicleId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;

const PRICING_POLICY: &str = "pricing";
const CAPACITY_POLICY: &str = "capacity";

/// Routes, prices, durations, the fleet and the policy singletons in PostgreSQL
pub struct PgNetworkRepository {
    pool: PgPool,
}

impl PgNetworkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_policy<T: DeserializeOwned + Send + Unpin + 'static>(&self, name: &str) -> CoreResult<Option<T>> {
        let row: Option<(Json<T>,)> = sqlx::query_as("SELECT body FROM policies WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        Ok(row.map(|(Json(body),)| body))
    }

    async fn store_policy<T: Serialize + Sync>(&self, name: &str, body: &T) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO policies (name, body) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(name)
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: i64,
    stops: Json<Vec<String>>,
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    stop1: String,
    stop2: String,
    category: String,
    price: i64,
    adjusted_at: Option<DateTime<Utc>>,
}

impl From<PriceRow> for PriceEntry {
    fn from(row: PriceRow) -> Self {
        PriceEntry {
            stop1: row.stop1,
            stop2: row.stop2,
            category: row.category,
            price: row.price,
            adjusted_at: row.adjusted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DurationRow {
    stop1: String,
    stop2: String,
    minutes: i32,
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    operator_name: String,
    license_no: String,
    category: String,
    base_departure: NaiveTime,
    route_id: Option<i64>,
    layout_id: i64,
    layout_name: String,
    layout_category: String,
    grid: Json<Vec<Vec<String>>>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            id: row.id,
            operator_name: row.operator_name,
            license_no: row.license_no,
            category: row.category,
            base_departure: row.base_departure,
            route_id: row.route_id,
            seat_layout: SeatLayout {
                id: row.layout_id,
                name: row.layout_name,
                category: row.layout_category,
                grid: row.grid.0,
            },
        }
    }
}

const VEHICLE_SELECT: &str = r#"
    SELECT v.id, v.operator_name, v.license_no, v.category, v.base_departure, v.route_id,
           l.id AS layout_id, l.name AS layout_name, l.category AS layout_category, l.grid
    FROM vehicles v
    JOIN seat_layouts l ON l.id = v.seat_layout_id
"#;

#[async_trait]
impl NetworkRepository for PgNetworkRepository {
    async fn load_network(&self) -> CoreResult<NetworkCatalog> {
        let route_rows: Vec<RouteRow> = sqlx::query_as("SELECT id, stops FROM routes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        let routes = route_rows
            .into_iter()
            .map(|row| Route::new(row.id, row.stops.0))
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let prices = self.list_prices().await?;

        let duration_rows: Vec<DurationRow> = sqlx::query_as("SELECT stop1, stop2, minutes FROM durations")
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        let durations = duration_rows
            .into_iter()
            .map(|row| DurationEntry {
                stop1: row.stop1,
                stop2: row.stop2,
                minutes: row.minutes.max(0) as u32,
            })
            .collect();

        Ok(NetworkCatalog::new(routes, prices, durations))
    }

    async fn price_for(&self, stop1: &str, stop2: &str, category: &str) -> CoreResult<PriceEntry> {
        let row: Option<PriceRow> = sqlx::query_as(
            r#"
            SELECT stop1, stop2, category, price, adjusted_at FROM prices
            WHERE ((LOWER(stop1) = LOWER($1) AND LOWER(stop2) = LOWER($2))
                OR (LOWER(stop1) = LOWER($2) AND LOWER(stop2) = LOWER($1)))
              AND LOWER(category) = LOWER($3)
            LIMIT 1
            "#,
        )
        .bind(stop1.trim())
        .bind(stop2.trim())
        .bind(category)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(PriceEntry::from).ok_or_else(|| CoreError::PriceUnavailable {
            origin: stop1.to_string(),
            destination: stop2.to_string(),
            category: category.to_string(),
        })
    }

    async fn list_prices(&self) -> CoreResult<Vec<PriceEntry>> {
        let rows: Vec<PriceRow> = sqlx::query_as(
            "SELECT stop1, stop2, category, price, adjusted_at FROM prices ORDER BY stop1, stop2, category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        Ok(rows.into_iter().map(PriceEntry::from).collect())
    }

    async fn save_price(&self, entry: &PriceEntry) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO prices (stop1, stop2, category, price, adjusted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (stop1, stop2, category)
            DO UPDATE SET price = EXCLUDED.price, adjusted_at = EXCLUDED.adjusted_at
            "#,
        )
        .bind(&entry.stop1)
        .bind(&entry.stop2)
        .bind(&entry.category)
        .bind(entry.price)
        .bind(entry.adjusted_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        Ok(())
    }

    async fn get_vehicle(&self, id: VehicleId) -> CoreResult<Option<Vehicle>> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!("{} WHERE v.id = $1", VEHICLE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        Ok(row.map(Vehicle::from))
    }

    async fn list_vehicles(&self) -> CoreResult<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> = sqlx::query_as(&format!("{} ORDER BY v.id", VEHICLE_SELECT))
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn assign_route(&self, vehicle_id: VehicleId, route_id: RouteId) -> CoreResult<()> {
        let result = sqlx::query("UPDATE vehicles SET route_id = $2 WHERE id = $1")
            .bind(vehicle_id)
            .bind(route_id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("vehicle {}", vehicle_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyRepository for PgNetworkRepository {
    async fn pricing_policy(&self) -> CoreResult<Option<PricingPolicy>> {
        self.load_policy(PRICING_POLICY).await
    }

    async fn save_pricing_policy(&self, policy: &PricingPolicy) -> CoreResult<()> {
        policy.validate()?;
        self.store_policy(PRICING_POLICY, policy).await
    }

    async fn capacity_policy(&self) -> CoreResult<Option<CapacityPolicy>> {
        self.load_policy(CAPACITY_POLICY).await
    }

    async fn save_capacity_policy(&self, policy: &CapacityPolicy) -> CoreResult<()> {
        policy.validate()?;
        self.store_policy(CAPACITY_POLICY, policy).await
    }
}
