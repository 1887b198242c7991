use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Which half of the catalog a schedule, location or vehicle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Train,
    Flight,
}

impl BookingKind {
    pub const ALL: [BookingKind; 2] = [BookingKind::Train, BookingKind::Flight];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::Train => "train",
            BookingKind::Flight => "flight",
        }
    }

    /// Human name of the location entity for this kind.
    pub fn location_label(&self) -> &'static str {
        match self {
            BookingKind::Train => "station",
            BookingKind::Flight => "airport",
        }
    }

    pub fn schedule_label(&self) -> &'static str {
        match self {
            BookingKind::Train => "train schedule",
            BookingKind::Flight => "flight schedule",
        }
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(BookingKind::Train),
            "flight" => Ok(BookingKind::Flight),
            other => Err(CoreError::ValidationFailed(format!("unknown booking kind '{}'", other))),
        }
    }
}

/// Fare tier. Each class has its own price and seat inventory per schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TravelClass {
    #[default]
    Economy,
    Business,
    First,
}

impl TravelClass {
    pub const ALL: [TravelClass; 3] = [TravelClass::Economy, TravelClass::Business, TravelClass::First];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelClass::Economy => "economy",
            TravelClass::Business => "business",
            TravelClass::First => "first",
        }
    }
}

impl fmt::Display for TravelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "economy" => Ok(TravelClass::Economy),
            "business" => Ok(TravelClass::Business),
            "first" => Ok(TravelClass::First),
            other => Err(CoreError::ValidationFailed(format!("unknown travel class '{}'", other))),
        }
    }
}

/// One value per travel class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ByClass<T> {
    pub economy: T,
    pub business: T,
    pub first: T,
}

impl<T> ByClass<T> {
    pub fn new(economy: T, business: T, first: T) -> Self {
        Self { economy, business, first }
    }

    pub fn get(&self, class: TravelClass) -> &T {
        match class {
            TravelClass::Economy => &self.economy,
            TravelClass::Business => &self.business,
            TravelClass::First => &self.first,
        }
    }

    pub fn get_mut(&mut self, class: TravelClass) -> &mut T {
        match class {
            TravelClass::Economy => &mut self.economy,
            TravelClass::Business => &mut self.business,
            TravelClass::First => &mut self.first,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TravelClass, &T)> {
        TravelClass::ALL.into_iter().map(move |class| (class, self.get(class)))
    }
}

/// Seat counts per class (capacity or availability).
pub type SeatCounts = ByClass<i32>;

/// Unit prices per class, in cents.
pub type Fares = ByClass<i64>;

/// Tagged reference to either a train schedule or a flight schedule.
///
/// Bookings persist this as a `booking_type` discriminator plus `schedule_id`;
/// every lookup goes through the tag rather than a raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleRef {
    #[serde(rename = "booking_kind")]
    pub kind: BookingKind,
    #[serde(rename = "schedule_id")]
    pub id: i64,
}

impl ScheduleRef {
    pub fn new(kind: BookingKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn train(id: i64) -> Self {
        Self::new(BookingKind::Train, id)
    }

    pub fn flight(id: i64) -> Self {
        Self::new(BookingKind::Flight, id)
    }
}

impl fmt::Display for ScheduleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind.schedule_label(), self.id)
    }
}
