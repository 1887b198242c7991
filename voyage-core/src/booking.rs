use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::travel::{BookingKind, ByClass, ScheduleRef, TravelClass};
use crate::validate::{clean_optional, optional_text, required_text};
use crate::{CoreError, CoreResult};

/// Upper bound on passengers in a single booking.
pub const MAX_PASSENGERS: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::Storage(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(CoreError::ValidationFailed(format!("unknown gender '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MealPreference {
    None,
    Vegetarian,
    NonVegetarian,
    Vegan,
    Kosher,
    Halal,
}

impl MealPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealPreference::None => "none",
            MealPreference::Vegetarian => "vegetarian",
            MealPreference::NonVegetarian => "non-vegetarian",
            MealPreference::Vegan => "vegan",
            MealPreference::Kosher => "kosher",
            MealPreference::Halal => "halal",
        }
    }
}

impl FromStr for MealPreference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MealPreference::None),
            "vegetarian" => Ok(MealPreference::Vegetarian),
            "non-vegetarian" => Ok(MealPreference::NonVegetarian),
            "vegan" => Ok(MealPreference::Vegan),
            "kosher" => Ok(MealPreference::Kosher),
            "halal" => Ok(MealPreference::Halal),
            other => Err(CoreError::ValidationFailed(format!("unknown meal preference '{}'", other))),
        }
    }
}

// ============================================================================
// Passengers
// ============================================================================

/// Per-traveller details captured at booking time. Seat numbers are free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerDetails {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub gender: Gender,
    #[serde(default)]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub meal_preference: Option<MealPreference>,
}

impl PassengerDetails {
    pub fn validate(&self, index: usize) -> CoreResult<()> {
        let label = |field: &str| format!("passenger {} {}", index + 1, field);
        required_text(&label("first_name"), &self.first_name, 50)?;
        required_text(&label("last_name"), &self.last_name, 50)?;
        if !(0..=150).contains(&self.age) {
            return Err(CoreError::ValidationFailed(format!(
                "{} must be between 0 and 150",
                label("age")
            )));
        }
        optional_text(&label("seat_number"), self.seat_number.as_deref(), 10)?;
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            seat_number: clean_optional(self.seat_number),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: i64,
    pub booking_id: i64,
    #[serde(flatten)]
    pub details: PassengerDetails,
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub schedule: ScheduleRef,
    pub travel_class: TravelClass,
    /// Cents, fixed at booking time.
    pub total_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub passengers: Vec<Passenger>,
}

impl Booking {
    pub fn passenger_count(&self) -> i32 {
        self.passengers.len() as i32
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

/// Reservation request as submitted by a signed-in user.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub schedule_id: i64,
    pub booking_kind: BookingKind,
    pub travel_class: TravelClass,
    pub passenger_count: i32,
    pub passengers: Vec<PassengerDetails>,
}

impl BookingRequest {
    pub fn schedule_ref(&self) -> ScheduleRef {
        ScheduleRef::new(self.booking_kind, self.schedule_id)
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_passenger_count(self.passenger_count)?;
        if self.passengers.len() != self.passenger_count as usize {
            return Err(CoreError::ValidationFailed(format!(
                "expected details for {} passengers, got {}",
                self.passenger_count,
                self.passengers.len()
            )));
        }
        for (index, passenger) in self.passengers.iter().enumerate() {
            passenger.validate(index)?;
        }
        Ok(())
    }
}

pub fn validate_passenger_count(count: i32) -> CoreResult<()> {
    if !(1..=MAX_PASSENGERS).contains(&count) {
        return Err(CoreError::ValidationFailed(format!(
            "passenger count must be between 1 and {}",
            MAX_PASSENGERS
        )));
    }
    Ok(())
}

/// What the store needs to reserve seats. The total is computed by the store
/// from the fare it reads under the seat-counter lock.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub schedule: ScheduleRef,
    pub travel_class: TravelClass,
    pub passengers: Vec<PassengerDetails>,
}

impl NewBooking {
    pub fn passenger_count(&self) -> i32 {
        self.passengers.len() as i32
    }
}

/// Aggregate booking counts for the admin dashboard and reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingStats {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub train: i64,
    pub flight: i64,
    pub by_class: ByClass<i64>,
}

impl BookingStats {
    pub fn record(&mut self, booking: &Booking) {
        self.total += 1;
        match booking.status {
            BookingStatus::Confirmed => self.confirmed += 1,
            BookingStatus::Cancelled => self.cancelled += 1,
        }
        match booking.schedule.kind {
            BookingKind::Train => self.train += 1,
            BookingKind::Flight => self.flight += 1,
        }
        *self.by_class.get_mut(booking.travel_class) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger(first: &str) -> PassengerDetails {
        PassengerDetails {
            first_name: first.to_string(),
            last_name: "Traveller".to_string(),
            age: 34,
            gender: Gender::Female,
            seat_number: Some("12A".to_string()),
            meal_preference: Some(MealPreference::NonVegetarian),
        }
    }

    fn request(count: i32, passengers: Vec<PassengerDetails>) -> BookingRequest {
        BookingRequest {
            schedule_id: 1,
            booking_kind: BookingKind::Train,
            travel_class: TravelClass::Economy,
            passenger_count: count,
            passengers,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request(2, vec![passenger("Ana"), passenger("Ben")]).validate().is_ok());
    }

    #[test]
    fn test_passenger_list_must_match_count() {
        let result = request(2, vec![passenger("Ana")]).validate();
        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_passenger_count_bounds() {
        assert!(request(0, vec![]).validate().is_err());
        let many = (0..10).map(|_| passenger("Ana")).collect();
        assert!(request(10, many).validate().is_err());
    }

    #[test]
    fn test_blank_passenger_name_rejected() {
        let result = request(1, vec![passenger("   ")]).validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_meal_preference_wire_format() {
        let json = serde_json::to_value(passenger("Ana")).unwrap();
        assert_eq!(json["meal_preference"], "non-vegetarian");
        assert_eq!(json["gender"], "female");
    }

    #[test]
    fn test_stats_record() {
        let booking = Booking {
            id: 1,
            user_id: 1,
            schedule: ScheduleRef::flight(3),
            travel_class: TravelClass::Business,
            total_amount: 500,
            status: BookingStatus::Cancelled,
            created_at: Utc::now(),
            passengers: vec![],
        };
        let mut stats = BookingStats::default();
        stats.record(&booking);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.flight, 1);
        assert_eq!(stats.by_class.business, 1);
    }
}
