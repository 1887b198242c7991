use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Location, Vehicle};
use crate::travel::{BookingKind, Fares, ScheduleRef, SeatCounts, TravelClass};
use crate::{CoreError, CoreResult};

/// A timed trip of one vehicle between two locations, with its own fares and seat inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub kind: BookingKind,
    pub vehicle_id: i64,
    pub departure_location_id: i64,
    pub arrival_location_id: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub fares: Fares,
    pub available_seats: SeatCounts,
}

impl Schedule {
    pub fn reference(&self) -> ScheduleRef {
        ScheduleRef::new(self.kind, self.id)
    }

    /// Counters to use when the schedule moves from a vehicle with `old_capacity`
    /// to one with `new_capacity`. Only allowed while nothing has been sold.
    pub fn reseed_for_vehicle(
        &self,
        old_capacity: &SeatCounts,
        new_capacity: &SeatCounts,
    ) -> CoreResult<SeatCounts> {
        if self.available_seats != *old_capacity {
            return Err(CoreError::Conflict(format!(
                "{} already has seats sold and cannot change vehicle",
                self.reference()
            )));
        }
        Ok(*new_capacity)
    }
}

/// Admin-supplied fields for creating or editing a schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    pub vehicle_id: i64,
    pub departure_location_id: i64,
    pub arrival_location_id: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub fares: Fares,
}

impl ScheduleInput {
    pub fn validate(&self) -> CoreResult<()> {
        if self.departure_location_id == self.arrival_location_id {
            return Err(CoreError::ValidationFailed(
                "departure and arrival locations must differ".to_string(),
            ));
        }
        if self.arrival_time <= self.departure_time {
            return Err(CoreError::ValidationFailed(
                "arrival time must be after departure time".to_string(),
            ));
        }
        for (class, price) in self.fares.iter() {
            if *price < 0 {
                return Err(CoreError::ValidationFailed(format!("{} price cannot be negative", class)));
            }
        }
        Ok(())
    }
}

/// A schedule joined with its vehicle and both locations, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDetails {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub vehicle: Vehicle,
    pub departure: Location,
    pub arrival: Location,
}

impl ScheduleDetails {
    pub fn reference(&self) -> ScheduleRef {
        self.schedule.reference()
    }

    pub fn total_seats(&self, class: TravelClass) -> i32 {
        *self.vehicle.capacity.get(class)
    }

    pub fn available_seats(&self, class: TravelClass) -> i32 {
        *self.schedule.available_seats.get(class)
    }

    pub fn unit_price(&self, class: TravelClass) -> i64 {
        *self.schedule.fares.get(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input() -> ScheduleInput {
        ScheduleInput {
            vehicle_id: 1,
            departure_location_id: 1,
            arrival_location_id: 2,
            departure_time: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
            fares: Fares::new(10_000, 25_000, 40_000),
        }
    }

    #[test]
    fn test_valid_schedule_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_arrival_must_follow_departure() {
        let mut bad = input();
        bad.arrival_time = bad.departure_time;
        assert!(matches!(bad.validate(), Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_locations_must_differ() {
        let mut bad = input();
        bad.arrival_location_id = bad.departure_location_id;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut bad = input();
        bad.fares.first = -1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_reseed_only_when_untouched() {
        let old = SeatCounts::new(100, 20, 5);
        let new = SeatCounts::new(80, 10, 0);
        let mut schedule = Schedule {
            id: 7,
            kind: BookingKind::Train,
            vehicle_id: 1,
            departure_location_id: 1,
            arrival_location_id: 2,
            departure_time: input().departure_time,
            arrival_time: input().arrival_time,
            fares: input().fares,
            available_seats: old,
        };
        assert_eq!(schedule.reseed_for_vehicle(&old, &new).unwrap(), new);

        schedule.available_seats.economy -= 1;
        assert!(matches!(
            schedule.reseed_for_vehicle(&old, &new),
            Err(CoreError::Conflict(_))
        ));
    }
}
