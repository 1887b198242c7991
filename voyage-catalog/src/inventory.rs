use serde::{Deserialize, Serialize};
use voyage_core::{CoreError, SeatCounts, TravelClass};

/// Per-class seat inventory of one schedule.
///
/// Holds `0 <= available <= capacity` for every class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInventory {
    pub capacity: SeatCounts,
    pub available: SeatCounts,
}

impl SeatInventory {
    /// Fresh inventory with every seat free.
    pub fn seed(capacity: SeatCounts) -> Self {
        Self {
            capacity,
            available: capacity,
        }
    }

    pub fn new(capacity: SeatCounts, available: SeatCounts) -> Result<Self, InventoryError> {
        for (class, free) in available.iter() {
            let cap = *capacity.get(class);
            if *free < 0 || *free > cap {
                return Err(InventoryError::OutOfRange {
                    class,
                    available: *free,
                    capacity: cap,
                });
            }
        }
        Ok(Self { capacity, available })
    }

    /// Take `quantity` seats, or fail without touching the counter.
    pub fn reserve(&mut self, class: TravelClass, quantity: i32) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let free = self.available.get_mut(class);
        if *free < quantity {
            return Err(InventoryError::InsufficientInventory {
                requested: quantity,
                available: *free,
            });
        }
        *free -= quantity;
        Ok(())
    }

    /// Give back `quantity` seats. Never exceeds capacity.
    pub fn release(&mut self, class: TravelClass, quantity: i32) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let cap = *self.capacity.get(class);
        let free = self.available.get_mut(class);
        *free = (*free + quantity).min(cap);
        Ok(())
    }

}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        requested: i32,
        available: i32,
    },

    #[error("Seat quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("{class} availability {available} outside 0..={capacity}")]
    OutOfRange {
        class: TravelClass,
        available: i32,
        capacity: i32,
    },
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientInventory { requested, available } => {
                CoreError::InsufficientCapacity { requested, available }
            }
            InventoryError::InvalidQuantity(_) => CoreError::ValidationFailed(err.to_string()),
            InventoryError::OutOfRange { .. } => CoreError::Storage(err.to_string()),
        }
    }
}
