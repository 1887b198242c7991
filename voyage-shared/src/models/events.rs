use chrono::{DateTime, Utc};

/// Audit payload emitted once a booking transaction commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: i64,
    pub user_id: i64,
    pub booking_kind: String,
    pub schedule_id: i64,
    pub travel_class: String,
    pub passengers: usize,
    pub total_amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Audit payload emitted when seats are returned to a schedule.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: i64,
    pub cancelled_by: i64,
    pub booking_kind: String,
    pub schedule_id: i64,
    pub travel_class: String,
    pub seats_released: usize,
    pub timestamp: DateTime<Utc>,
}

impl BookingConfirmedEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl BookingCancelledEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
