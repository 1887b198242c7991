pub mod travel;
pub mod catalog;
pub mod schedule;
pub mod identity;
pub mod booking;
pub mod search;
pub mod repository;
mod validate;

pub use travel::{BookingKind, ByClass, Fares, ScheduleRef, SeatCounts, TravelClass};
pub use identity::{Actor, AdminActor};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not enough seats available: requested {requested}, available {available}")]
    InsufficientCapacity {
        requested: i32,
        available: i32,
    },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication required: {0}")]
    Unauthenticated(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} {} does not exist", what, id))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
