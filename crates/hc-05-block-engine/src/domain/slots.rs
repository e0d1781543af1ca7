//! # Slot Allocation
//!
//! Wall-clock time after the genesis block is cut into slots of
//! `gap_between_blocks` seconds plus `max_block_generation_time` ms. Slot
//! `i` belongs to position `i % number_of_nodes`:
//!
//! ```text
//!  genesis
//!    │ slot 0 │ slot 1 │ slot 2 │ slot 3 │ ...
//!    │ pos 0  │ pos 1  │ pos 2  │ pos 0  │      (3 nodes)
//! ```
//!
//! A block is out of time when its position does not own its slot, or
//! the slot already holds a committed block.

use hc_01_system_parameters::SystemParameters;
use hc_02_state_store::Tables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTimeCounter {
    /// Genesis time, seconds.
    start: i64,
    duration_ms: i64,
    nodes: i64,
}

impl BlockTimeCounter {
    pub fn new(start: i64, duration_ms: i64, nodes: i64) -> Self {
        Self {
            start,
            duration_ms: duration_ms.max(1),
            nodes: nodes.max(1),
        }
    }

    /// Counter for the current chain. `None` before genesis.
    pub fn from_chain(params: &SystemParameters, tables: &Tables) -> Option<Self> {
        let genesis = tables.block(1)?;
        let duration_ms = params.gap_between_blocks() * 1000
            + params.max_block_generation_time().as_millis() as i64;
        Some(Self::new(genesis.time, duration_ms, params.number_of_nodes()))
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Slot holding `time`, `None` before genesis.
    pub fn slot_index(&self, time: i64) -> Option<i64> {
        if time < self.start {
            return None;
        }
        Some((time - self.start) * 1000 / self.duration_ms)
    }

    /// Position owning the slot of `time`.
    pub fn node_position(&self, time: i64) -> Option<i64> {
        self.slot_index(time).map(|slot| slot % self.nodes)
    }

    /// Slot bounds in milliseconds, `[start, end)`.
    pub fn slot_range_ms(&self, time: i64) -> Option<(i64, i64)> {
        let slot = self.slot_index(time)?;
        let start = self.start * 1000 + slot * self.duration_ms;
        Some((start, start + self.duration_ms))
    }

    /// True when a block at `time` by `position` must be refused.
    pub fn block_for_time_exists(&self, tables: &Tables, time: i64, position: i64) -> bool {
        if self.node_position(time) != Some(position) {
            return true;
        }
        let Some((start_ms, end_ms)) = self.slot_range_ms(time) else {
            return true;
        };
        let from = ceil_div(start_ms, 1000);
        let to = ceil_div(end_ms, 1000);
        !tables.blocks_in_time_range(from, to).is_empty()
    }

    /// Whether `position` may produce a block at `time`.
    pub fn time_to_generate(&self, time: i64, position: i64) -> bool {
        self.node_position(time) == Some(position)
    }

    /// Start, in seconds, of the next slot owned by `position` at or after `time`.
    pub fn next_own_slot(&self, time: i64, position: i64) -> i64 {
        let slot = self.slot_index(time).unwrap_or(0);
        let offset = (position - slot % self.nodes).rem_euclid(self.nodes);
        ceil_div(self.start * 1000 + (slot + offset) * self.duration_ms, 1000)
    }
}

fn ceil_div(value: i64, by: i64) -> i64 {
    (value + by - 1).div_euclid(by)
}
