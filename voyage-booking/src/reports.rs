use serde::Serialize;
use std::sync::Arc;

use voyage_core::booking::Booking;
use voyage_core::repository::{BookingRepository, UserRepository};
use voyage_core::{AdminActor, ByClass, CoreResult};

/// Bookings shown on the admin dashboard.
pub const RECENT_BOOKINGS: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_users: i64,
    pub total_bookings: i64,
    pub confirmed_bookings: i64,
    pub cancelled_bookings: i64,
    pub train_bookings: i64,
    pub flight_bookings: i64,
    pub recent_bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KindCounts {
    pub train: i64,
    pub flight: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCounts {
    pub confirmed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReport {
    pub total_users: i64,
    pub total_bookings: i64,
    pub by_kind: KindCounts,
    pub by_status: StatusCounts,
    pub by_class: ByClass<i64>,
}

pub struct Reporting {
    users: Arc<dyn UserRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl Reporting {
    pub fn new(users: Arc<dyn UserRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { users, bookings }
    }

    pub async fn dashboard(&self, _admin: &AdminActor) -> CoreResult<Dashboard> {
        let total_users = self.users.count_users().await?;
        let stats = self.bookings.booking_stats().await?;
        let recent_bookings = self.bookings.recent_bookings(RECENT_BOOKINGS).await?;
        Ok(Dashboard {
            total_users,
            total_bookings: stats.total,
            confirmed_bookings: stats.confirmed,
            cancelled_bookings: stats.cancelled,
            train_bookings: stats.train,
            flight_bookings: stats.flight,
            recent_bookings,
        })
    }

    pub async fn report(&self, _admin: &AdminActor) -> CoreResult<BookingReport> {
        let total_users = self.users.count_users().await?;
        let stats = self.bookings.booking_stats().await?;
        Ok(BookingReport {
            total_users,
            total_bookings: stats.total,
            by_kind: KindCounts {
                train: stats.train,
                flight: stats.flight,
            },
            by_status: StatusCounts {
                confirmed: stats.confirmed,
                cancelled: stats.cancelled,
            },
            by_class: stats.by_class,
        })
    }
}
