//! Fuel metering.

use crate::error::{ExecError, Result};

/// Payload bytes priced by one `price_tx_data` unit.
pub const DATA_CHUNK: usize = 1024;

/// Tracks fuel spent by one transaction against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuelMeter {
    budget: i64,
    used: i64,
}

impl FuelMeter {
    pub fn new(budget: i64) -> Self {
        Self { budget, used: 0 }
    }

    /// Spend `amount`, failing once the budget is exceeded.
    pub fn charge(&mut self, amount: i64) -> Result<()> {
        self.used = self.used.saturating_add(amount.max(0));
        if self.used > self.budget {
            return Err(ExecError::FuelExhausted {
                used: self.used,
                budget: self.budget,
            });
        }
        Ok(())
    }

    pub fn used(&self) -> i64 {
        self.used
    }

    pub fn budget(&self) -> i64 {
        self.budget
    }
}

/// Fuel for carrying `size` payload bytes: one price unit per started KiB.
pub fn data_cost(size: usize, price_tx_data: i64) -> i64 {
    let chunks = size.div_ceil(DATA_CHUNK) as i64;
    chunks.saturating_mul(price_tx_data)
}
