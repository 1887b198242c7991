pub mod inventory;
pub mod pricing;
pub mod matching;

pub use inventory::{InventoryError, SeatInventory};
pub use pricing::{quote, total_fare, FareQuote};
pub use matching::{like_pattern, location_matches};
