//! # Limits Meter
//!
//! Per-block and per-transaction resource accounting. Each sub-limiter
//! reports a violation class; the mode turns the class into a verdict:
//!
//! | Limiter | Generating | Otherwise |
//! |---------|------------|-----------|
//! | tx size | Skip | Exceeded |
//! | block size | Stop | Exceeded |
//! | per-sender count | Defer | Exceeded |
//! | block tx count | Stop | Exceeded |
//! | tx fuel | Skip | Exceeded |
//! | block fuel | Stop | Exceeded |
//! | generation time | Time | not checked |
//!
//! Counters only advance for transactions that pass every limiter. A skipped
//! transaction can never fit and is dropped as bad; a deferred one waits in
//! the mempool for a later block.

use crate::error::LimitError;
use hc_01_system_parameters::SystemParameters;
use hc_04_transaction_executor::{Deadline, Transaction};
use std::collections::HashMap;

/// Why the meter is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitMode {
    /// Standalone transaction check before the mempool accepts it.
    Preprocess,
    /// Playing a block this node is producing.
    GenBlock,
    /// Playing a received block.
    Parsing,
}

enum Violation {
    Skip,
    Defer,
    Stop,
}

/// Snapshot of the limits plus the running block totals.
#[derive(Debug, Clone)]
pub struct Limits {
    mode: LimitMode,
    max_block_size: i64,
    max_tx_size: i64,
    max_tx_count: usize,
    max_user_tx: usize,
    max_tx_fuel: i64,
    max_block_fuel: i64,
    max_forsign_size: i64,
    deadline: Option<Deadline>,
    block_size: i64,
    count: usize,
    fuel: i64,
    per_user: HashMap<i64, usize>,
}

impl Limits {
    /// Read every limit from the parameter cache.
    pub fn new(params: &SystemParameters, mode: LimitMode) -> Self {
        let deadline = (mode == LimitMode::GenBlock)
            .then(|| Deadline::starting_now(params.max_block_generation_time()));
        Self {
            mode,
            max_block_size: params.max_block_size(),
            max_tx_size: params.max_tx_size(),
            max_tx_count: params.max_tx_block(),
            max_user_tx: params.max_block_user_tx(),
            max_tx_fuel: params.max_tx_fuel(),
            max_block_fuel: params.max_block_fuel(),
            max_forsign_size: params.max_forsign_size(),
            deadline,
            block_size: 0,
            count: 0,
            fuel: 0,
            per_user: HashMap::new(),
        }
    }

    pub fn mode(&self) -> LimitMode {
        self.mode
    }

    /// Generation deadline, shared with the VM.
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    fn verdict(&self, violation: Violation, reason: String) -> LimitError {
        match (self.mode, violation) {
            (LimitMode::GenBlock, Violation::Skip) => LimitError::Skip(reason),
            (LimitMode::GenBlock, Violation::Defer) => LimitError::Defer(reason),
            (LimitMode::GenBlock, Violation::Stop) => LimitError::Stop(reason),
            _ => LimitError::Exceeded(reason),
        }
    }

    /// Meter one played transaction.
    pub fn check_tx(&mut self, tx: &Transaction, fuel_used: i64) -> Result<(), LimitError> {
        let size = tx.size() as i64;
        if self.max_tx_size > 0 && size > self.max_tx_size {
            return Err(self.verdict(
                Violation::Skip,
                format!("tx size {size} > max_tx_size {}", self.max_tx_size),
            ));
        }
        let block_size = self.block_size + size;
        if self.max_block_size > 0 && block_size > self.max_block_size {
            return Err(self.verdict(
                Violation::Stop,
                format!("block size {block_size} > max_block_size {}", self.max_block_size),
            ));
        }

        let user_count = self.per_user.get(&tx.key_id()).copied().unwrap_or(0) + 1;
        if self.max_user_tx > 0 && user_count > self.max_user_tx {
            return Err(self.verdict(
                Violation::Defer,
                format!("key {} has more than {} txs", tx.key_id(), self.max_user_tx),
            ));
        }

        let count = self.count + 1;
        if self.max_tx_count > 0 && count > self.max_tx_count {
            return Err(self.verdict(
                Violation::Stop,
                format!("more than {} txs in block", self.max_tx_count),
            ));
        }

        if self.max_tx_fuel > 0 && fuel_used > self.max_tx_fuel {
            return Err(self.verdict(
                Violation::Skip,
                format!("tx fuel {fuel_used} > max_tx_fuel {}", self.max_tx_fuel),
            ));
        }
        let fuel = self.fuel.saturating_add(fuel_used);
        if self.max_block_fuel > 0 && fuel > self.max_block_fuel {
            return Err(self.verdict(
                Violation::Stop,
                format!("block fuel {fuel} > max_block_fuel {}", self.max_block_fuel),
            ));
        }

        if let Some(deadline) = &self.deadline {
            if deadline.check().is_err() {
                return Err(LimitError::Time);
            }
        }

        self.block_size = block_size;
        self.count = count;
        self.fuel = fuel;
        self.per_user.insert(tx.key_id(), user_count);
        Ok(())
    }

    /// The signing domain must stay under `max_forsign_size`.
    pub fn check_forsign(&self, forsign: &str) -> Result<(), LimitError> {
        let size = forsign.len() as i64;
        if self.max_forsign_size > 0 && size > self.max_forsign_size {
            return Err(LimitError::Exceeded(format!(
                "forsign size {size} > max_forsign_size {}",
                self.max_forsign_size
            )));
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn fuel(&self) -> i64 {
        self.fuel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_01_system_parameters::names;
    use hc_02_state_store::Database;
    use hc_04_transaction_executor::{smart_call, TxHeader};
    use shared_crypto::Ed25519KeyPair;

    fn params(pairs: &[(&str, &str)]) -> SystemParameters {
        let db = Database::in_memory();
        let mut tx = db.begin().unwrap();
        tx.seed_system_parameters(hc_01_system_parameters::DEFAULT_PARAMETERS.iter().copied());
        for (k, v) in pairs {
            tx.set_system_parameter(k, v);
        }
        let params = SystemParameters::new(vec![], vec![]);
        params.refresh(&tx).unwrap();
        params
    }

    fn tx(seed: u8, n: u8) -> Transaction {
        let key = Ed25519KeyPair::from_seed([seed; 32]);
        let header = TxHeader::for_key(&key, 1_000 + n as i64, 1, 1);
        smart_call(&key, header, "MoneyTransfer", &[("n", &n.to_string())]).unwrap()
    }

    #[test]
    fn test_block_count_stops_generation() {
        let p = params(&[(names::MAX_TX_BLOCK, "2")]);
        let mut limits = Limits::new(&p, LimitMode::GenBlock);
        limits.check_tx(&tx(1, 1), 10).unwrap();
        limits.check_tx(&tx(2, 2), 10).unwrap();
        assert!(matches!(limits.check_tx(&tx(3, 3), 10), Err(LimitError::Stop(_))));
        assert_eq!(limits.count(), 2);
    }

    #[test]
    fn test_user_cap_increments_then_compares() {
        let p = params(&[(names::MAX_BLOCK_USER_TX, "2")]);
        let mut limits = Limits::new(&p, LimitMode::GenBlock);
        limits.check_tx(&tx(1, 1), 0).unwrap();
        limits.check_tx(&tx(1, 2), 0).unwrap();
        assert!(matches!(limits.check_tx(&tx(1, 3), 0), Err(LimitError::Defer(_))));
        limits.check_tx(&tx(2, 4), 0).unwrap();
    }

    #[test]
    fn test_oversized_tx_is_skipped_while_generating() {
        let p = params(&[(names::MAX_TX_SIZE, "10")]);
        let mut limits = Limits::new(&p, LimitMode::GenBlock);
        assert!(matches!(limits.check_tx(&tx(1, 1), 0), Err(LimitError::Skip(_))));
        assert_eq!(limits.count(), 0);
    }

    #[test]
    fn test_violations_are_fatal_outside_generation() {
        let p = params(&[(names::MAX_TX_FUEL, "5")]);
        let mut limits = Limits::new(&p, LimitMode::Parsing);
        assert!(matches!(limits.check_tx(&tx(1, 1), 6), Err(LimitError::Exceeded(_))));
        assert!(limits.deadline().is_none());
    }

    #[test]
    fn test_block_fuel_stops() {
        let p = params(&[(names::MAX_BLOCK_FUEL, "15"), (names::MAX_TX_FUEL, "10")]);
        let mut limits = Limits::new(&p, LimitMode::GenBlock);
        limits.check_tx(&tx(1, 1), 10).unwrap();
        assert!(matches!(limits.check_tx(&tx(2, 2), 10), Err(LimitError::Stop(_))));
        assert_eq!(limits.fuel(), 10);
    }

    #[test]
    fn test_generation_deadline() {
        let p = params(&[(names::MAX_BLOCK_GENERATION_TIME, "0")]);
        let mut limits = Limits::new(&p, LimitMode::GenBlock);
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(limits.check_tx(&tx(1, 1), 0), Err(LimitError::Time));
    }

    #[test]
    fn test_forsign_size() {
        let p = params(&[(names::MAX_FORSIGN_SIZE, "4")]);
        let limits = Limits::new(&p, LimitMode::Parsing);
        assert!(limits.check_forsign("abcd").is_ok());
        assert!(limits.check_forsign("abcde").is_err());
    }
}
