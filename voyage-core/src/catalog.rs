use serde::{Deserialize, Serialize};

use crate::travel::{BookingKind, SeatCounts};
use crate::validate::{clean_optional, optional_text, required_text};
use crate::{CoreError, CoreResult};

// ============================================================================
// Locations (stations and airports)
// ============================================================================

/// A station (train) or airport (flight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub kind: BookingKind,
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub code: String,
    pub name: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
}

impl LocationInput {
    /// Station codes are 2-10 characters, airport codes exactly 3.
    pub fn validate(&self, kind: BookingKind) -> CoreResult<()> {
        let code_len = self.code.trim().chars().count();
        match kind {
            BookingKind::Train if !(2..=10).contains(&code_len) => {
                return Err(CoreError::ValidationFailed(
                    "station code must be between 2 and 10 characters".to_string(),
                ));
            }
            BookingKind::Flight if code_len != 3 => {
                return Err(CoreError::ValidationFailed(
                    "airport code must be exactly 3 characters".to_string(),
                ));
            }
            _ => {}
        }
        required_text("name", &self.name, 100)?;
        required_text("city", &self.city, 50)?;
        optional_text("state", self.state.as_deref(), 50)?;
        required_text("country", &self.country, 50)?;
        Ok(())
    }

    /// Trimmed copy, with a blank state collapsed to `None`.
    pub fn normalized(self) -> Self {
        Self {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            city: self.city.trim().to_string(),
            state: clean_optional(self.state),
            country: self.country.trim().to_string(),
        }
    }
}

// ============================================================================
// Vehicles (trains and flights)
// ============================================================================

/// A train or flight with its fixed per-class seat capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub kind: BookingKind,
    /// Train number or flight number.
    pub number: String,
    /// Train name or operating airline.
    pub name: String,
    pub aircraft_type: Option<String>,
    pub capacity: SeatCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleInput {
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub aircraft_type: Option<String>,
    pub capacity: SeatCounts,
}

impl VehicleInput {
    pub fn validate(&self, kind: BookingKind) -> CoreResult<()> {
        required_text("number", &self.number, 20)?;
        required_text("name", &self.name, 100)?;
        match kind {
            BookingKind::Flight => optional_text("aircraft_type", self.aircraft_type.as_deref(), 50)?,
            BookingKind::Train if clean_optional(self.aircraft_type.clone()).is_some() => {
                return Err(CoreError::ValidationFailed(
                    "aircraft_type only applies to flights".to_string(),
                ));
            }
            BookingKind::Train => {}
        }
        for (class, seats) in self.capacity.iter() {
            if *seats < 0 {
                return Err(CoreError::ValidationFailed(format!(
                    "{} capacity cannot be negative",
                    class
                )));
            }
        }
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            number: self.number.trim().to_string(),
            name: self.name.trim().to_string(),
            aircraft_type: clean_optional(self.aircraft_type),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(code: &str) -> LocationInput {
        LocationInput {
            code: code.to_string(),
            name: "Central".to_string(),
            city: "Springfield".to_string(),
            state: Some("  ".to_string()),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_station_code_length() {
        assert!(location("S").validate(BookingKind::Train).is_err());
        assert!(location("SPF").validate(BookingKind::Train).is_ok());
        assert!(location("SPRINGFIELD").validate(BookingKind::Train).is_err());
    }

    #[test]
    fn test_airport_code_length() {
        assert!(location("JFK").validate(BookingKind::Flight).is_ok());
        assert!(location("JF").validate(BookingKind::Flight).is_err());
        assert!(location("KJFK").validate(BookingKind::Flight).is_err());
    }

    #[test]
    fn test_blank_state_normalizes_to_none() {
        let input = location(" SPF ").normalized();
        assert_eq!(input.code, "SPF");
        assert_eq!(input.state, None);
    }

    #[test]
    fn test_vehicle_rejects_negative_capacity() {
        let input = VehicleInput {
            number: "12951".to_string(),
            name: "Rajdhani".to_string(),
            aircraft_type: None,
            capacity: SeatCounts::new(100, -1, 10),
        };
        assert!(matches!(input.validate(BookingKind::Train), Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_train_rejects_aircraft_type() {
        let input = VehicleInput {
            number: "12951".to_string(),
            name: "Rajdhani".to_string(),
            aircraft_type: Some("A320".to_string()),
            capacity: SeatCounts::new(100, 10, 10),
        };
        assert!(input.validate(BookingKind::Train).is_err());
        assert!(input.validate(BookingKind::Flight).is_ok());
    }
}
