use chrono::NaiveDate;
use coachline_shared::VehicleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use uuid::Uuid;

use crate::network::{SeatLayout, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
}

impl InventoryKey {
    pub fn new(vehicle_id: VehicleId, journey_date: NaiveDate) -> Self {
        Self { vehicle_id, journey_date }
    }
}

/// Seat occupancy for one vehicle on one journey date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatInventory {
    pub vehicle_id: VehicleId,
    pub journey_date: NaiveDate,
    pub total_seats: u32,
    pub available_seats: u32,
    /// seat label -> owning reservation
    pub booked_seats: BTreeMap<String, Uuid>,
}

impl SeatInventory {
    /// Capacity is taken from the layout once, here, and never recomputed
    pub fn new(vehicle_id: VehicleId, journey_date: NaiveDate, layout: &SeatLayout) -> Self {
        let total_seats = layout.seat_count();
        Self {
            vehicle_id,
            journey_date,
            total_seats,
            available_seats: total_seats,
            booked_seats: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.vehicle_id, self.journey_date)
    }

    pub fn is_booked(&self, seat: &str) -> bool {
        self.booked_seats.contains_key(seat)
    }

    pub fn holder_of(&self, seat: &str) -> Option<Uuid> {
        self.booked_seats.get(seat).copied()
    }

    pub fn first_conflict<'a>(&self, seats: &'a [String]) -> Option<&'a str> {
        seats.iter().map(String::as_str).find(|s| self.is_booked(s))
    }

    /// All-or-nothing: every seat is checked before any is inserted.
    pub fn try_reserve(&mut self, seats: &[String], reservation_id: Uuid) -> Result<(), InventoryError> {
        if let Some(seat) = self.first_conflict(seats) {
            return Err(InventoryError::SeatConflict(seat.to_string()));
        }

        let mut unique = BTreeSet::new();
        for seat in seats {
            if !unique.insert(seat.as_str()) {
                return Err(InventoryError::DuplicateSeat(seat.clone()));
            }
        }

        let requested = seats.len() as u32;
        if requested > self.available_seats {
            return Err(InventoryError::InsufficientSeats {
                requested,
                available: self.available_seats,
            });
        }

        for seat in seats {
            self.booked_seats.insert(seat.clone(), reservation_id);
        }
        self.available_seats -= requested;

        Ok(())
    }

    /// Frees the given labels; labels that are already free are ignored.
    /// Returns how many seats were actually freed.
    pub fn release(&mut self, seats: &[String]) -> u32 {
        let mut freed = 0;
        for seat in seats {
            if self.booked_seats.remove(seat).is_some() {
                freed += 1;
            }
        }
        self.available_seats = (self.available_seats + freed).min(self.total_seats);
        freed
    }

    pub fn booked_count(&self) -> u32 {
        self.booked_seats.len() as u32
    }

    /// `available == total - |booked|`
    pub fn is_consistent(&self) -> bool {
        self.available_seats + self.booked_count() == self.total_seats
    }
}

/// Process-local ledger of seat inventories.
///
/// The key map is only locked long enough to find or insert a record; each
/// record has its own mutex, so bookings on different (vehicle, date) pairs
/// never wait on each other.
pub struct SeatLedger {
    records: RwLock<HashMap<InventoryKey, Arc<Mutex<SeatInventory>>>>,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &InventoryKey) -> Option<Arc<Mutex<SeatInventory>>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Existing record, or a fresh one sized from the vehicle's layout.
    /// Concurrent first callers all end up with the same record.
    pub fn get_or_create(&self, vehicle: &Vehicle, journey_date: NaiveDate) -> SeatInventory {
        let key = InventoryKey::new(vehicle.id, journey_date);
        if let Some(slot) = self.slot(&key) {
            return lock(&slot).clone();
        }

        let slot = {
            let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
            records
                .entry(key)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(SeatInventory::new(vehicle.id, journey_date, &vehicle.seat_layout)))
                })
                .clone()
        };

        let inventory = lock(&slot);
        inventory.clone()
    }

    pub fn snapshot(&self, key: &InventoryKey) -> Option<SeatInventory> {
        self.slot(key).map(|slot| lock(&slot).clone())
    }

    /// Runs `f` while holding the record's lock
    pub fn with_inventory<R>(
        &self,
        key: &InventoryKey,
        f: impl FnOnce(&mut SeatInventory) -> R,
    ) -> Result<R, InventoryError> {
        let slot = self.slot(key).ok_or(InventoryError::NotFound {
            vehicle_id: key.vehicle_id,
            journey_date: key.journey_date,
        })?;
        let mut guard = lock(&slot);
        Ok(f(&mut guard))
    }

    pub fn try_reserve(
        &self,
        key: &InventoryKey,
        seats: &[String],
        reservation_id: Uuid,
    ) -> Result<SeatInventory, InventoryError> {
        self.with_inventory(key, |inventory| {
            inventory.try_reserve(seats, reservation_id)?;
            Ok(inventory.clone())
        })?
    }

    pub fn release(&self, key: &InventoryKey, seats: &[String]) -> Result<u32, InventoryError> {
        self.with_inventory(key, |inventory| inventory.release(seats))
    }

    /// Drops records for journey dates strictly before `date`
    pub fn purge_before(&self, date: NaiveDate) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|key, _| key.journey_date >= date);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(slot: &Mutex<SeatInventory>) -> MutexGuard<'_, SeatInventory> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InventoryError {
    #[error("Seat {0} is already booked")]
    SeatConflict(String),

    #[error("Seat {0} requested more than once")]
    DuplicateSeat(String),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats { requested: u32, available: u32 },

    #[error("No seat inventory for vehicle {vehicle_id} on {journey_date}")]
    NotFound {
        vehicle_id: VehicleId,
        journey_date: NaiveDate,
    },
}
