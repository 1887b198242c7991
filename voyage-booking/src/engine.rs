use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use voyage_catalog::{quote, FareQuote};
use voyage_core::booking::{Booking, BookingRequest, NewBooking};
use voyage_core::repository::{BookingRepository, ScheduleRepository};
use voyage_core::schedule::ScheduleDetails;
use voyage_core::search::SearchQuery;
use voyage_core::{Actor, CoreError, CoreResult, ScheduleRef, TravelClass};
use voyage_shared::models::events::{BookingCancelledEvent, BookingConfirmedEvent};

/// One search hit: the trip plus the fare for the requested class and party.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOption {
    pub schedule: ScheduleDetails,
    pub fare: FareQuote,
}

/// A booking together with the trip it refers to, if that still exists.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub schedule: Option<ScheduleDetails>,
}

/// Search, quote, reserve and cancel.
pub struct BookingEngine {
    schedules: Arc<dyn ScheduleRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl BookingEngine {
    pub fn new(schedules: Arc<dyn ScheduleRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { schedules, bookings }
    }

    /// Open to anonymous callers. Sold-out schedules are included.
    pub async fn search(&self, query: &SearchQuery) -> CoreResult<Vec<ScheduleOption>> {
        query.validate()?;
        let (from, to) = query.day_window()?;

        let matches = self
            .schedules
            .search_schedules(query.booking_kind, &query.source, &query.destination, from, to)
            .await?;

        debug!(
            "Search {} {} -> {} on {}: {} result(s)",
            query.booking_kind,
            query.source,
            query.destination,
            query.date,
            matches.len()
        );

        matches
            .into_iter()
            .map(|details| {
                let fare = quote(&details, query.travel_class, query.passengers)?;
                Ok(ScheduleOption { schedule: details, fare })
            })
            .collect()
    }

    pub async fn quote(
        &self,
        actor: &Actor,
        schedule: ScheduleRef,
        travel_class: TravelClass,
        passengers: i32,
    ) -> CoreResult<FareQuote> {
        actor.require_user()?;
        let details = self.load_schedule(schedule).await?;
        quote(&details, travel_class, passengers)
    }

    /// Reserve seats for every passenger in one unit of work.
    pub async fn create_booking(&self, actor: &Actor, request: BookingRequest) -> CoreResult<Booking> {
        // 1. Caller and request shape
        let user_id = actor.require_user()?;
        request.validate()?;

        // 2. Schedule must exist
        let schedule_ref = request.schedule_ref();
        let details = self.load_schedule(schedule_ref).await?;

        // 3. Early capacity check; the store re-checks atomically
        let fare = quote(&details, request.travel_class, request.passenger_count)?;
        if !fare.is_bookable() {
            return Err(CoreError::InsufficientCapacity {
                requested: fare.passengers,
                available: fare.available_seats,
            });
        }

        // 4. Reserve and record
        let booking = self
            .bookings
            .create_booking(NewBooking {
                user_id,
                schedule: schedule_ref,
                travel_class: request.travel_class,
                passengers: request.passengers.into_iter().map(|p| p.normalized()).collect(),
            })
            .await?;

        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            user_id,
            booking_kind: booking.schedule.kind.to_string(),
            schedule_id: booking.schedule.id,
            travel_class: booking.travel_class.to_string(),
            passengers: booking.passengers.len(),
            total_amount: booking.total_amount,
            timestamp: Utc::now(),
        };
        info!(target: "audit", event = %event.to_json(), "Booking {} confirmed", booking.id);

        Ok(booking)
    }

    /// Owner or admin only. A second cancellation returns the booking unchanged.
    pub async fn cancel_booking(&self, actor: &Actor, booking_id: i64) -> CoreResult<Booking> {
        let caller = actor.require_user()?;
        let booking = self.load_owned(actor, booking_id).await?;

        if booking.is_cancelled() {
            debug!("Booking {} already cancelled, nothing to release", booking_id);
            return Ok(booking);
        }

        let cancelled = self.bookings.cancel_booking(booking_id).await?;

        let event = BookingCancelledEvent {
            booking_id,
            cancelled_by: caller,
            booking_kind: cancelled.schedule.kind.to_string(),
            schedule_id: cancelled.schedule.id,
            travel_class: cancelled.travel_class.to_string(),
            seats_released: cancelled.passengers.len(),
            timestamp: Utc::now(),
        };
        info!(target: "audit", event = %event.to_json(), "Booking {} cancelled", booking_id);

        Ok(cancelled)
    }

    pub async fn get_booking(&self, actor: &Actor, booking_id: i64) -> CoreResult<BookingView> {
        actor.require_user()?;
        let booking = self.load_owned(actor, booking_id).await?;
        let schedule = self.schedules.get_schedule(booking.schedule).await?;
        Ok(BookingView { booking, schedule })
    }

    /// The caller's own bookings, newest first.
    pub async fn history(&self, actor: &Actor) -> CoreResult<Vec<BookingView>> {
        let user_id = actor.require_user()?;
        let bookings = self.bookings.list_bookings_for_user(user_id).await?;

        let mut trips: HashMap<ScheduleRef, Option<ScheduleDetails>> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let schedule = match trips.get(&booking.schedule) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.schedules.get_schedule(booking.schedule).await?;
                    trips.insert(booking.schedule, loaded.clone());
                    loaded
                }
            };
            views.push(BookingView { booking, schedule });
        }
        Ok(views)
    }

    async fn load_schedule(&self, schedule: ScheduleRef) -> CoreResult<ScheduleDetails> {
        self.schedules
            .get_schedule(schedule)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", schedule)))
    }

    /// NotFound takes precedence over Forbidden.
    async fn load_owned(&self, actor: &Actor, booking_id: i64) -> CoreResult<Booking> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))?;
        if !actor.can_access(booking.user_id) {
            return Err(CoreError::Forbidden(format!(
                "booking {} belongs to another user",
                booking_id
            )));
        }
        Ok(booking)
    }
}
