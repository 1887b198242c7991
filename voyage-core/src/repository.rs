use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::booking::{Booking, BookingStats, NewBooking};
use crate::catalog::{Location, LocationInput, Vehicle, VehicleInput};
use crate::identity::{NewUser, User};
use crate::schedule::{ScheduleDetails, ScheduleInput};
use crate::travel::{BookingKind, ScheduleRef};
use crate::CoreResult;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Conflict when the username or email is already taken.
    async fn create_user(&self, user: NewUser) -> CoreResult<User>;

    async fn find_user_by_id(&self, id: i64) -> CoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn find_first_admin(&self) -> CoreResult<Option<User>>;

    /// Returns whether a row was removed.
    async fn delete_user(&self, id: i64) -> CoreResult<bool>;

    async fn count_users(&self) -> CoreResult<i64>;
}

/// Repository trait for stations, airports, trains and flights
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_location(&self, kind: BookingKind, input: LocationInput) -> CoreResult<Location>;

    async fn update_location(
        &self,
        kind: BookingKind,
        id: i64,
        input: LocationInput,
    ) -> CoreResult<Location>;

    /// Conflict while any schedule departs from or arrives at the location.
    async fn delete_location(&self, kind: BookingKind, id: i64) -> CoreResult<()>;

    async fn get_location(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Location>>;

    async fn list_locations(&self, kind: BookingKind) -> CoreResult<Vec<Location>>;

    async fn create_vehicle(&self, kind: BookingKind, input: VehicleInput) -> CoreResult<Vehicle>;

    /// Conflict when the capacity changes while schedules exist for the vehicle.
    async fn update_vehicle(
        &self,
        kind: BookingKind,
        id: i64,
        input: VehicleInput,
    ) -> CoreResult<Vehicle>;

    /// Conflict while any schedule uses the vehicle.
    async fn delete_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<()>;

    async fn get_vehicle(&self, kind: BookingKind, id: i64) -> CoreResult<Option<Vehicle>>;

    async fn list_vehicles(&self, kind: BookingKind) -> CoreResult<Vec<Vehicle>>;
}

/// Repository trait for train and flight schedules
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Seeds every class counter from the vehicle's capacity as read in the same
    /// critical section as the insert. NotFound when the vehicle is missing.
    async fn create_schedule(
        &self,
        kind: BookingKind,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails>;

    /// Never re-seeds counters, except when the vehicle changes while nothing is sold.
    async fn update_schedule(
        &self,
        schedule: ScheduleRef,
        input: ScheduleInput,
    ) -> CoreResult<ScheduleDetails>;

    /// Conflict while the schedule has confirmed bookings.
    async fn delete_schedule(&self, schedule: ScheduleRef) -> CoreResult<()>;

    async fn get_schedule(&self, schedule: ScheduleRef) -> CoreResult<Option<ScheduleDetails>>;

    async fn list_schedules(&self, kind: BookingKind) -> CoreResult<Vec<ScheduleDetails>>;

    /// Schedules departing in `[from, to)` whose endpoints match the free-text
    /// terms, ordered by departure time then id.
    async fn search_schedules(
        &self,
        kind: BookingKind,
        source: &str,
        destination: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduleDetails>>;
}

/// Repository trait for bookings and their passengers
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomically checks and decrements the class counter, then records the
    /// booking and passengers. `InsufficientCapacity` leaves nothing behind.
    async fn create_booking(&self, booking: NewBooking) -> CoreResult<Booking>;

    /// Marks a confirmed booking cancelled and returns its seats in the same
    /// unit of work. Cancelling an already cancelled booking changes nothing.
    async fn cancel_booking(&self, id: i64) -> CoreResult<Booking>;

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings_for_user(&self, user_id: i64) -> CoreResult<Vec<Booking>>;

    async fn recent_bookings(&self, limit: i64) -> CoreResult<Vec<Booking>>;

    async fn booking_stats(&self) -> CoreResult<BookingStats>;
}
