use std::sync::Arc;

use voyage_booking::{AccountService, BookingEngine, CatalogAdmin, Reporting};
use voyage_store::{RedisClient, Repositories};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone, Copy)]
pub struct RateLimit {
    pub requests_per_window: i64,
    pub window_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub admin: Arc<CatalogAdmin>,
    pub accounts: Arc<AccountService>,
    pub reports: Arc<Reporting>,
    /// `None` switches rate limiting off.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimit,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        redis: Option<RedisClient>,
        auth: AuthConfig,
        rate_limit: RateLimit,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            engine: Arc::new(BookingEngine::new(repos.schedules.clone(), repos.bookings.clone())),
            admin: Arc::new(CatalogAdmin::new(repos.catalog.clone(), repos.schedules.clone())),
            accounts: Arc::new(AccountService::new(repos.users.clone(), bcrypt_cost)),
            reports: Arc::new(Reporting::new(repos.users, repos.bookings)),
            redis: redis.map(Arc::new),
            rate_limit,
            auth,
        }
    }
}
