use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::validate_passenger_count;
use crate::travel::{BookingKind, TravelClass};
use crate::validate::required_text;
use crate::{CoreError, CoreResult};

/// Search criteria for schedules departing on a given calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub booking_kind: BookingKind,
    /// Free text matched against the departure location's name, code or city.
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub travel_class: TravelClass,
    #[serde(default = "default_passengers")]
    pub passengers: i32,
}

fn default_passengers() -> i32 {
    1
}

impl SearchQuery {
    pub fn validate(&self) -> CoreResult<()> {
        required_text("source", &self.source, 100)?;
        required_text("destination", &self.destination, 100)?;
        validate_passenger_count(self.passengers)
    }

    /// Half-open UTC window `[date 00:00, date+1 00:00)`.
    pub fn day_window(&self) -> CoreResult<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self
            .date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CoreError::ValidationFailed("invalid search date".to_string()))?
            .and_utc();
        let end = self
            .date
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .ok_or_else(|| CoreError::ValidationFailed("search date out of range".to_string()))?
            .and_utc();
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query() -> SearchQuery {
        SearchQuery {
            booking_kind: BookingKind::Train,
            source: "Delhi".to_string(),
            destination: "Mumbai".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            travel_class: TravelClass::Economy,
            passengers: 2,
        }
    }

    #[test]
    fn test_day_window_covers_whole_day() {
        let (start, end) = query().day_window().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_blank_source_rejected() {
        let mut q = query();
        q.source = "  ".to_string();
        assert!(matches!(q.validate(), Err(CoreError::ValidationFailed(_))));
    }

    #[test]
    fn test_zero_passengers_rejected() {
        let mut q = query();
        q.passengers = 0;
        assert!(q.validate().is_err());
    }
}
