pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;

mod booking_repo;
mod catalog_repo;
mod schedule_repo;
mod sql;
mod user_repo;

use sqlx::PgPool;
use std::sync::Arc;

use voyage_core::repository::{
    BookingRepository, CatalogRepository, ScheduleRepository, UserRepository,
};

pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use schedule_repo::PgScheduleRepository;
pub use user_repo::PgUserRepository;

/// One handle per repository trait, all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            schedules: Arc::new(PgScheduleRepository::new(pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            catalog: store.clone(),
            schedules: store.clone(),
            bookings: store,
        }
    }
}
