//! In-process implementation of every repository trait.
//!
//! Each mutation runs under one write guard, which gives bookings and
//! cancellations the same all-or-nothing behaviour as a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use voyage_catalog::{location_matches, total_fare, SeatInventory};
use voyage_core::booking::{Booking, BookingStats, BookingStatus, NewBooking, Passenger};
use voyage_core::catalog::{Location, LocationInput, Vehicle, VehicleInput};
use voyage_core::identity::{NewUser, User};
use voyage_core::repository::{
    BookingRepository, CatalogRepository, ScheduleRepository, UserRepository,
};
use voyage_core::schedule::{Schedule, ScheduleDetails, ScheduleInput};
use voyage_core::{BookingKind, CoreError, CoreResult, ScheduleRef};

#[derive(Default)]
struct KindState {
    locations: BTreeMap<i64, Location>,
    vehicles: BTreeMap<i64, Vehicle>,
    schedules: BTreeMap<i64, Schedule>,
    next_location: i64,
    next_vehicle: i64,
    next_schedule: i64,
}

impl KindState {
    fn location_in_use(&self, id: i64) -> bool {
        self.schedules
            .values()
            .any(|s| s.departure_location_id == id || s.arrival_location_id == id)
    }

    fn vehicle_in_use(&self, id: i64) -> bool {
        self.schedules.values().any(|s| s.vehicle_id == id)
    }

    fn details(&self, schedule: &Schedule) -> CoreResult<ScheduleDetails> {
        let dangling = || CoreError::Storage(format!("{} has a dangling reference", schedule.reference()));
        Ok(ScheduleDetails {
            schedule: schedule.clone(),
            vehicle: self.vehicles.get(&schedule.vehicle_id).cloned().ok_or_else(dangling)?,
            departure: self
                .locations
                .get(&schedule.departure_location_id)
                .cloned()
                .ok_or_else(dangling)?,
            arrival: self
                .locations
                .get(&schedule.arrival_location_id)
                .cloned()
                .ok_or_else(dangling)?,
        })
    }

    fn check_references(&self, kind: BookingKind, input: &ScheduleInput) -> CoreResult<&Vehicle> {
        for id in [input.departure_location_id, input.arrival_location_id] {
            if !self.locations.contains_key(&id) {
                return Err(CoreError::not_found(kind.location_label(), id));
            }
        }
        self.vehicles
            .get(&input.vehicle_id)
            .ok_or_else(|| CoreError::not_found(kind.as_str(), input.vehicle_id))
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    bookings: BTreeMap<i64, Booking>,
    trains: KindState,
    flights: KindState,
    next_user: i64,
    next_booking: i64,
    next_passenger: i64,
}

impl MemoryState {
    fn kind(&self, kind: BookingKind) -> &KindState {
        match kind {
            BookingKind::Train => &self.trains,
            BookingKind::Flight => &self.flights,
        }
    }

    fn kind_mut(&mut self, kind: BookingKind) -> &mut KindState {
        match kind {
            BookingKind::Train => &mut self.trains,
            BookingKind::Flight => &mut self.flights,
        }
    }

    /// Inventory for one schedule, checked against its vehicle.
    fn inventory(&self, schedule: ScheduleRef) -> CoreResult<Option<SeatInventory>> {
        let state = self.kind(schedule.kind);
        let Some(s) = state.schedules.get(&schedule.id) else {
            return Ok(None);
        };
        let vehicle = state
            .vehicles
            .get(&s.vehicle_id)
            .ok_or_else(|| CoreError::Storage(format!("{} has no vehicle", schedule)))?;
        Ok(Some(SeatInventory::new(vehicle.capacity, s.available_seats)?))
    }

    fn set_available(&mut self, schedule: ScheduleRef, inventory: &SeatInventory) {
        if let Some(s) = self.kind_mut(schedule.kind).schedules.get_mut(&schedule.id) {
            s.available_seats = inventory.available;
        }
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

fn newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Every repository trait over one shared in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> CoreResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(CoreError::Conflict(
                "username or email is already registered".to_string(),
            ));
        }
        let id = next_id(&mut state.next_user);
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> CoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_first_admin(&self) -> CoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.is_admin).cloned())
    }

    async fn delete_user(&self, id: i64) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        if state.bookings.values().any(|b| b.user_id == id) {
            return Err(CoreError::Conflict(format!("user {} still has bookings", id)));
        }
        Ok(state.users.remove(&id).is_some())
    }

    async fn count_users(&self) -> CoreResult<i64> {
        Ok(self.state.read().await.users.len() as i64)
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_location(&self, kind: BookingKind, input: LocationInput) -> CoreResult<Location> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if catalog.locations.values().any(|l| l.code == input.code) {
            return Err(CoreError::Conflict(format!(
                "{} code {} already exists",
                kind.location_label(),
                input.code
            )));
        }
        let id = next_id(&mut catalog.next_location);
        let location = Location {
            id,
            kind,
            code: input.code,
            name: input.name,
            city: input.city,
            state: input.state,
            country: input.country,
        };
        catalog.locations.insert(id, location.clone());
        Ok(location)
    }

    async fn update_location(
        &self,
        kind: BookingKind,
        id: i64,
        input: LocationInput,
    ) -> CoreResult<Location> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if catalog
            .locations
            .values()
            .any(|l| l.id != id && l.code == input.code)
        {
            return Err(CoreError::Conflict(format!(
                "{} code {} already exists",
                kind.location_label(),
                input.code
            )));
        }
        let location = catalog
            .locations
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(kind.location_label(), id))?;
        location.code = input.code;
        location.name = input.name;
        location.city = input.city;
        location.state = input.state;
        location.country = input.country;
        Ok(location.clone())
    }

    async fn delete_location(&self, kind: BookingKind, id: i64) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if !catalog.locations.contains_key(&id) {
            return Err(CoreError::not_found(kind.location_label(), id));
        }
        if catalog.location_in_use(id) {
            return Err(CoreError::Conflict(format!(
                "{} {} is used by a schedule",
                kind.location_label(),
                id
            )));
        }
        catalog.locations.remove(&id);
        Ok(())
    }

    async fn get_location(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Location>> {
        Ok(self.state.read().await.kind(kind).locations.get(&id).cloned())
    }

    async fn list_locations(&self, kind: BookingKind) -> CoreResult<Vec<Location>> {
        Ok(self.state.read().await.kind(kind).locations.values().cloned().collect())
    }

    async fn create_vehicle(&self, kind: BookingKind, input: VehicleInput) -> CoreResult<Vehicle> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if catalog.vehicles.values().any(|v| v.number == input.number) {
            return Err(CoreError::Conflict(format!("{} {} already exists", kind, input.number)));
        }
        let id = next_id(&mut catalog.next_vehicle);
        let vehicle = Vehicle {
            id,
            kind,
            number: input.number,
            name: input.name,
            aircraft_type: match kind {
                BookingKind::Flight => input.aircraft_type,
                BookingKind::Train => None,
            },
            capacity: input.capacity,
        };
        catalog.vehicles.insert(id, vehicle.clone());
        Ok(vehicle)
    }

    async fn update_vehicle(
        &self,
        kind: BookingKind,
        id: i64,
        input: VehicleInput,
    ) -> CoreResult<Vehicle> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if catalog
            .vehicles
            .values()
            .any(|v| v.id != id && v.number == input.number)
        {
            return Err(CoreError::Conflict(format!("{} {} already exists", kind, input.number)));
        }
        let in_use = catalog.vehicle_in_use(id);
        let vehicle = catalog
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(kind.as_str(), id))?;
        if vehicle.capacity != input.capacity && in_use {
            return Err(CoreError::Conflict(format!(
                "{} {} has schedules; its capacity cannot change",
                kind, id
            )));
        }
        vehicle.number = input.number;
        vehicle.name = input.name;
        if kind == BookingKind::Flight {
            vehicle.aircraft_type = input.aircraft_type;
        }
        vehicle.capacity = input.capacity;
        Ok(vehicle.clone())
    }

    async fn delete_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        if !catalog.vehicles.contains_key(&id) {
            return Err(CoreError::not_found(kind.as_str(), id));
        }
        if catalog.vehicle_in_use(id) {
            return Err(CoreError::Conflict(format!("{} {} is used by a schedule", kind, id)));
        }
        catalog.vehicles.remove(&id);
        Ok(())
    }

    async fn get_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Vehicle>> {
        Ok(self.state.read().await.kind(kind).vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self, kind: BookingKind) -> CoreResult<Vec<Vehicle>> {
        Ok(self.state.read().await.kind(kind).vehicles.values().cloned().collect())
    }
}

// ============================================================================
// Schedules
// ============================================================================

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn create_schedule(
        &self,
        kind: BookingKind,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        let seats = SeatInventory::seed(catalog.check_references(kind, &input)?.capacity);

        let id = next_id(&mut catalog.next_schedule);
        let created = Schedule {
            id,
            kind,
            vehicle_id: input.vehicle_id,
            departure_location_id: input.departure_location_id,
            arrival_location_id: input.arrival_location_id,
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            fares: input.fares,
            available_seats: seats.available,
        };
        catalog.schedules.insert(id, created.clone());
        catalog.details(&created)
    }

    async fn update_schedule(
        &self,
        schedule: ScheduleRef,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails> {
        let kind = schedule.kind;
        let mut state = self.state.write().await;
        let catalog = state.kind_mut(kind);
        let new_capacity = catalog.check_references(kind, &input)?.capacity;

        let current = catalog
            .schedules
            .get(&schedule.id)
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))?;

        let mut seats = current.available_seats;
        if input.vehicle_id != current.vehicle_id {
            let old_capacity = catalog
                .vehicles
                .get(&current.vehicle_id)
                .map(|v| v.capacity)
                .ok_or_else(|| CoreError::not_found(kind.as_str(), current.vehicle_id))?;
            seats = current.reseed_for_vehicle(&old_capacity, &new_capacity)?;
        }

        let updated = Schedule {
            id: schedule.id,
            kind,
            vehicle_id: input.vehicle_id,
            departure_location_id: input.departure_location_id,
            arrival_location_id: input.arrival_location_id,
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            fares: input.fares,
            available_seats: seats,
        };
        catalog.schedules.insert(schedule.id, updated.clone());
        catalog.details(&updated)
    }

    async fn delete_schedule(&self, schedule: ScheduleRef) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if !state.kind(schedule.kind).schedules.contains_key(&schedule.id) {
            return Err(CoreError::NotFound(format!("{} does not exist", schedule)));
        }
        let booked = state
            .bookings
            .values()
            .any(|b| b.schedule == schedule && b.status == BookingStatus::Confirmed);
        if booked {
            return Err(CoreError::Conflict(format!("{} has confirmed bookings", schedule)));
        }
        state.kind_mut(schedule.kind).schedules.remove(&schedule.id);
        Ok(())
    }

    async fn get_schedule(&self, schedule: ScheduleRef) -> CoreResult<Option<ScheduleDetails>> {
        let state = self.state.read().await;
        let catalog = state.kind(schedule.kind);
        catalog
            .schedules
            .get(&schedule.id)
            .map(|s| catalog.details(s))
            .transpose()
    }

    async fn list_schedules(&self, kind: BookingKind) -> CoreResult<Vec<ScheduleDetails>> {
        let state = self.state.read().await;
        let catalog = state.kind(kind);
        catalog.schedules.values().map(|s| catalog.details(s)).collect()
    }

    async fn search_schedules(
        &self,
        kind: BookingKind,
        source: &str,
        destination: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduleDetails>> {
        let state = self.state.read().await;
        let catalog = state.kind(kind);
        let mut hits = Vec::new();
        for schedule in catalog.schedules.values() {
            if schedule.departure_time < from || schedule.departure_time >= to {
                continue;
            }
            let details = catalog.details(schedule)?;
            if location_matches(&details.departure, source) && location_matches(&details.arrival, destination) {
                hits.push(details);
            }
        }
        hits.sort_by(|a, b| {
            a.schedule
                .departure_time
                .cmp(&b.schedule.departure_time)
                .then(a.schedule.id.cmp(&b.schedule.id))
        });
        Ok(hits)
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: NewBooking) -> CoreResult<Booking> {
        let mut state = self.state.write().await;
        let schedule = booking.schedule;

        // 1. Reserve, or fail with nothing changed
        let mut inventory = state
            .inventory(schedule)?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))?;
        inventory.reserve(booking.travel_class, booking.passenger_count())?;

        let unit_price = state
            .kind(schedule.kind)
            .schedules
            .get(&schedule.id)
            .map(|s| *s.fares.get(booking.travel_class))
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))?;
        let total_amount = total_fare(unit_price, booking.passenger_count())?;

        // 2. Record, then publish the new counters
        let id = next_id(&mut state.next_booking);
        let mut passengers = Vec::with_capacity(booking.passengers.len());
        for details in booking.passengers {
            passengers.push(Passenger {
                id: next_id(&mut state.next_passenger),
                booking_id: id,
                details,
            });
        }
        let created = Booking {
            id,
            user_id: booking.user_id,
            schedule,
            travel_class: booking.travel_class,
            total_amount,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
            passengers,
        };
        state.set_available(schedule, &inventory);
        state.bookings.insert(id, created.clone());
        Ok(created)
    }

    async fn cancel_booking(&self, id: i64) -> CoreResult<Booking> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }

        if let Some(mut inventory) = state.inventory(booking.schedule)? {
            inventory.release(booking.travel_class, booking.passenger_count())?;
            state.set_available(booking.schedule, &inventory);
        }
        let stored = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        stored.status = BookingStatus::Cancelled;
        Ok(stored.clone())
    }

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(&self, user_id: i64) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut bookings);
        Ok(bookings)
    }

    async fn recent_bookings(&self, limit: i64) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state.bookings.values().cloned().collect();
        newest_first(&mut bookings);
        bookings.truncate(limit.max(0) as usize);
        Ok(bookings)
    }

    async fn booking_stats(&self) -> CoreResult<BookingStats> {
        let state = self.state.read().await;
        let mut stats = BookingStats::default();
        for booking in state.bookings.values() {
            stats.record(booking);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use voyage_core::booking::{Gender, PassengerDetails};
    use voyage_core::{Fares, SeatCounts, TravelClass};

    async fn seeded(store: &MemoryStore) -> ScheduleRef {
        let location = |code: &str| LocationInput {
            code: code.to_string(),
            name: format!("{} Main", code),
            city: code.to_string(),
            state: None,
            country: "DE".to_string(),
        };
        let a = store.create_location(BookingKind::Train, location("BER")).await.unwrap();
        let b = store.create_location(BookingKind::Train, location("MUC")).await.unwrap();
        let train = store
            .create_vehicle(
                BookingKind::Train,
                VehicleInput {
                    number: "ICE1".to_string(),
                    name: "ICE".to_string(),
                    aircraft_type: None,
                    capacity: SeatCounts::new(3, 1, 0),
                },
            )
            .await
            .unwrap();
        let input = ScheduleInput {
            vehicle_id: train.id,
            departure_location_id: a.id,
            arrival_location_id: b.id,
            departure_time: Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            fares: Fares::new(100, 300, 0),
        };
        store
            .create_schedule(BookingKind::Train, input)
            .await
            .unwrap()
            .reference()
    }

    fn party(schedule: ScheduleRef, size: usize) -> NewBooking {
        NewBooking {
            user_id: 1,
            schedule,
            travel_class: TravelClass::Economy,
            passengers: (0..size)
                .map(|_| PassengerDetails {
                    first_name: "Kim".to_string(),
                    last_name: "Lee".to_string(),
                    age: 40,
                    gender: Gender::Other,
                    seat_number: None,
                    meal_preference: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_insufficient_capacity_leaves_no_trace() {
        let store = MemoryStore::new();
        let schedule = seeded(&store).await;

        let booking = store.create_booking(party(schedule, 2)).await.unwrap();
        assert_eq!(booking.total_amount, 200);

        let err = store.create_booking(party(schedule, 2)).await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientCapacity { requested: 2, available: 1 }));
        assert_eq!(store.booking_stats().await.unwrap().total, 1);

        let details = store.get_schedule(schedule).await.unwrap().unwrap();
        assert_eq!(details.schedule.available_seats.economy, 1);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = MemoryStore::new();
        let schedule = seeded(&store).await;
        let booking = store.create_booking(party(schedule, 3)).await.unwrap();

        store.cancel_booking(booking.id).await.unwrap();
        store.cancel_booking(booking.id).await.unwrap();

        let details = store.get_schedule(schedule).await.unwrap().unwrap();
        assert_eq!(details.schedule.available_seats.economy, 3);
    }

    #[tokio::test]
    async fn test_new_schedule_seeds_from_current_capacity() {
        let store = MemoryStore::new();
        let existing = store.get_schedule(seeded(&store).await).await.unwrap().unwrap();

        let vehicle = VehicleInput {
            number: "RE5".to_string(),
            name: "Regional".to_string(),
            aircraft_type: None,
            capacity: SeatCounts::new(3, 1, 0),
        };
        let train = store.create_vehicle(BookingKind::Train, vehicle.clone()).await.unwrap();
        let resized = VehicleInput {
            capacity: SeatCounts::new(8, 2, 1),
            ..vehicle
        };
        store.update_vehicle(BookingKind::Train, train.id, resized).await.unwrap();

        // `train` still carries the old capacity; the store must not trust it
        let input = ScheduleInput {
            vehicle_id: train.id,
            departure_location_id: existing.departure.id,
            arrival_location_id: existing.arrival.id,
            departure_time: Utc.with_ymd_and_hms(2024, 6, 2, 6, 0, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap(),
            fares: Fares::new(100, 300, 500),
        };
        let created = store.create_schedule(BookingKind::Train, input).await.unwrap();
        assert_eq!(train.capacity, SeatCounts::new(3, 1, 0));
        assert_eq!(created.schedule.available_seats, SeatCounts::new(8, 2, 1));
    }

    #[tokio::test]
    async fn test_missing_schedule_is_not_found() {
        let store = MemoryStore::new();
        let err = store.create_booking(party(ScheduleRef::train(42), 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_window_is_half_open() {
        let store = MemoryStore::new();
        seeded(&store).await;
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap();

        let hits = store
            .search_schedules(BookingKind::Train, "ber", "munich main", day(1), day(2))
            .await
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .search_schedules(BookingKind::Train, "ber", "MUC", day(1), day(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store
            .search_schedules(BookingKind::Train, "ber", "MUC", day(2), day(3))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_kinds_are_separate() {
        let store = MemoryStore::new();
        let schedule = seeded(&store).await;
        assert!(store.get_schedule(ScheduleRef::flight(schedule.id)).await.unwrap().is_none());
        assert!(store.list_locations(BookingKind::Flight).await.unwrap().is_empty());
    }
}
