use serde::{Deserialize, Serialize};
use voyage_core::booking::validate_passenger_count;
use voyage_core::schedule::ScheduleDetails;
use voyage_core::{CoreError, CoreResult, ScheduleRef, TravelClass};

/// Price and availability of one class on one schedule for a party size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    #[serde(flatten)]
    pub schedule: ScheduleRef,
    pub travel_class: TravelClass,
    pub passengers: i32,
    /// Cents per passenger.
    pub unit_price: i64,
    /// Cents for the whole party.
    pub total_price: i64,
    pub available_seats: i32,
    pub total_seats: i32,
}

impl FareQuote {
    pub fn is_bookable(&self) -> bool {
        self.available_seats >= self.passengers
    }
}

/// Unit price times party size. Fails instead of wrapping.
pub fn total_fare(unit_price: i64, passengers: i32) -> CoreResult<i64> {
    unit_price
        .checked_mul(i64::from(passengers))
        .ok_or_else(|| CoreError::ValidationFailed("fare total out of range".to_string()))
}

/// Quote a class on a schedule. Reports availability but does not reserve.
pub fn quote(
    details: &ScheduleDetails,
    travel_class: TravelClass,
    passengers: i32,
) -> CoreResult<FareQuote> {
    validate_passenger_count(passengers)?;
    let unit_price = details.unit_price(travel_class);
    Ok(FareQuote {
        schedule: details.reference(),
        travel_class,
        passengers,
        unit_price,
        total_price: total_fare(unit_price, passengers)?,
        available_seats: details.available_seats(travel_class),
        total_seats: details.total_seats(travel_class),
    })
}
