pub mod engine;
pub mod admin;
pub mod accounts;
pub mod reports;

pub use engine::{BookingEngine, BookingView, ScheduleOption};
pub use admin::CatalogAdmin;
pub use accounts::{AccountService, AdminOutcome, RegisterRequest};
pub use reports::{BookingReport, Dashboard, Reporting};
