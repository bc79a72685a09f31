use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use coachline_catalog::{InventoryKey, SeatInventory, Vehicle};
use coachline_core::repository::{ReservationRepository, SalesFeed};
use coachline_core::{CoreError, CoreResult};
use coachline_shared::{SaleRecord, Ticket, TicketStatus};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Seat inventories and tickets in PostgreSQL.
///
/// Every seat mutation runs in a transaction holding `FOR UPDATE` on the
/// inventory row, which serializes bookings per (vehicle, date).
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    vehicle_id: i64,
    journey_date: NaiveDate,
    total_seats: i32,
    available_seats: i32,
    booked_seats: Json<BTreeMap<String, Uuid>>,
}

impl From<InventoryRow> for SeatInventory {
    fn from(row: InventoryRow) -> Self {
        SeatInventory {
            vehicle_id: row.vehicle_id,
            journey_date: row.journey_date,
            total_seats: row.total_seats.max(0) as u32,
            available_seats: row.available_seats.max(0) as u32,
            booked_seats: row.booked_seats.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    code: String,
    user_id: String,
    vehicle_id: i64,
    journey_date: NaiveDate,
    seats: Json<Vec<String>>,
    source: String,
    destination: String,
    category: String,
    total_price: i64,
    departure_time: NaiveTime,
    created_at: DateTime<Utc>,
    status: String,
}

impl TicketRow {
    fn into_ticket(self) -> CoreResult<Ticket> {
        let status = TicketStatus::parse(&self.status)
            .ok_or_else(|| CoreError::Storage(format!("ticket {} has unknown status {}", self.id, self.status)))?;
        Ok(Ticket {
            id: self.id,
            code: self.code,
            user_id: self.user_id,
            vehicle_id: self.vehicle_id,
            journey_date: self.journey_date,
            seats: self.seats.0,
            source: self.source,
            destination: self.destination,
            category: self.category,
            total_price: self.total_price,
            departure_time: self.departure_time,
            created_at: self.created_at,
            status,
        })
    }
}

const INVENTORY_COLUMNS: &str = "vehicle_id, journey_date, total_seats, available_seats, booked_seats";
const TICKET_COLUMNS: &str = "id, code, user_id, vehicle_id, journey_date, seats, source, destination, category, \
                              total_price, departure_time, created_at, status";

async fn lock_inventory(
    tx: &mut Transaction<'_, Postgres>,
    key: &InventoryKey,
) -> CoreResult<Option<SeatInventory>> {
    let row: Option<InventoryRow> = sqlx::query_as(&format!(
        "SELECT {} FROM seat_inventory WHERE vehicle_id = $1 AND journey_date = $2 FOR UPDATE",
        INVENTORY_COLUMNS
    ))
    .bind(key.vehicle_id)
    .bind(key.journey_date)
    .fetch_optional(&mut **tx)
    .await
    .map_err(CoreError::storage)?;
    Ok(row.map(SeatInventory::from))
}

async fn write_inventory(tx: &mut Transaction<'_, Postgres>, inventory: &SeatInventory) -> CoreResult<()> {
    sqlx::query(
        "UPDATE seat_inventory SET available_seats = $3, booked_seats = $4 WHERE vehicle_id = $1 AND journey_date = $2",
    )
    .bind(inventory.vehicle_id)
    .bind(inventory.journey_date)
    .bind(inventory.available_seats as i32)
    .bind(Json(&inventory.booked_seats))
    .execute(&mut **tx)
    .await
    .map_err(CoreError::storage)?;
    Ok(())
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn get_or_create_inventory(&self, vehicle: &Vehicle, journey_date: NaiveDate) -> CoreResult<SeatInventory> {
        let fresh = SeatInventory::new(vehicle.id, journey_date, &vehicle.seat_layout);

        // Concurrent first callers race on the primary key; the loser's insert is a no-op
        sqlx::query(
            r#"
            INSERT INTO seat_inventory (vehicle_id, journey_date, total_seats, available_seats, booked_seats)
            VALUES ($1, $2, $3, $3, '{}'::jsonb)
            ON CONFLICT (vehicle_id, journey_date) DO NOTHING
            "#,
        )
        .bind(vehicle.id)
        .bind(journey_date)
        .bind(fresh.total_seats as i32)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        self.find_inventory(fresh.key())
            .await?
            .ok_or_else(|| CoreError::Storage(format!("inventory for vehicle {} vanished", vehicle.id)))
    }

    async fn find_inventory(&self, key: InventoryKey) -> CoreResult<Option<SeatInventory>> {
        let row: Option<InventoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM seat_inventory WHERE vehicle_id = $1 AND journey_date = $2",
            INVENTORY_COLUMNS
        ))
        .bind(key.vehicle_id)
        .bind(key.journey_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        Ok(row.map(SeatInventory::from))
    }

    async fn commit_booking(&self, ticket: &Ticket) -> CoreResult<SeatInventory> {
        let key = InventoryKey::new(ticket.vehicle_id, ticket.journey_date);
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        // 1. Authoritative seat check under the row lock
        let mut inventory = lock_inventory(&mut tx, &key).await?.ok_or_else(|| {
            CoreError::NotFound(format!("inventory for vehicle {} on {}", key.vehicle_id, key.journey_date))
        })?;
        inventory.try_reserve(&ticket.seats, ticket.id)?;

        // 2. Seats and ticket in the same transaction
        write_inventory(&mut tx, &inventory).await?;
        sqlx::query(&format!(
            "INSERT INTO tickets ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(&ticket.code)
        .bind(&ticket.user_id)
        .bind(ticket.vehicle_id)
        .bind(ticket.journey_date)
        .bind(Json(&ticket.seats))
        .bind(&ticket.source)
        .bind(&ticket.destination)
        .bind(&ticket.category)
        .bind(ticket.total_price)
        .bind(ticket.departure_time)
        .bind(ticket.created_at)
        .bind(ticket.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;
        Ok(inventory)
    }

    async fn commit_cancellation(&self, ticket_id: Uuid) -> CoreResult<Ticket> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        let row: Option<TicketRow> = sqlx::query_as(&format!("SELECT {} FROM tickets WHERE id = $1 FOR UPDATE", TICKET_COLUMNS))
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(CoreError::storage)?;
        let mut ticket = row
            .ok_or_else(|| CoreError::NotFound(format!("ticket {}", ticket_id)))?
            .into_ticket()?;
        if !ticket.is_booked() {
            return Err(CoreError::AlreadyCancelled(ticket_id));
        }

        let key = InventoryKey::new(ticket.vehicle_id, ticket.journey_date);
        if let Some(mut inventory) = lock_inventory(&mut tx, &key).await? {
            let held: Vec<String> = ticket
                .seats
                .iter()
                .filter(|seat| inventory.holder_of(seat) == Some(ticket_id))
                .cloned()
                .collect();
            inventory.release(&held);
            write_inventory(&mut tx, &inventory).await?;
        }

        sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
            .bind(ticket_id)
            .bind(TicketStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;
        ticket.cancel();
        Ok(ticket)
    }

    async fn get_ticket(&self, id: Uuid) -> CoreResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn find_ticket_by_code(&self, code: &str) -> CoreResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!("SELECT {} FROM tickets WHERE code = $1", TICKET_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn tickets_for_user(&self, user_id: &str) -> CoreResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC",
            TICKET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn purge_inventory_before(&self, date: NaiveDate) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM seat_inventory WHERE journey_date < $1")
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(CoreError::storage)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SalesFeed for PgReservationRepository {
    async fn sales_since(&self, since: DateTime<Utc>) -> CoreResult<Vec<SaleRecord>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets WHERE created_at >= $1 ORDER BY created_at",
            TICKET_COLUMNS
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        rows.into_iter()
            .map(|row| row.into_ticket().map(|t| t.sale_record()))
            .collect()
    }
}
