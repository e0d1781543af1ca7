//! Sender ban list.
//!
//! Keys whose transactions keep failing are refused at submission for a
//! while. A generator that had to drop the only transaction of a block bans
//! its sender straight away.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Bad transactions tolerated before a key is banned.
pub const DEFAULT_BAD_TX_THRESHOLD: u32 = 10;
pub const DEFAULT_BAN_TIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Default)]
struct KeyRecord {
    bad_count: u32,
    banned_until: Option<Instant>,
}

/// In-memory ban list keyed by account id.
#[derive(Debug)]
pub struct TxBanList {
    threshold: u32,
    ban_time: Duration,
    keys: Mutex<HashMap<i64, KeyRecord>>,
}

impl Default for TxBanList {
    fn default() -> Self {
        Self::new(DEFAULT_BAD_TX_THRESHOLD, DEFAULT_BAN_TIME)
    }
}

impl TxBanList {
    pub fn new(threshold: u32, ban_time: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            ban_time,
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Ban a key now.
    pub fn ban(&self, key_id: i64) {
        let mut keys = self.keys.lock();
        let record = keys.entry(key_id).or_default();
        record.banned_until = Some(Instant::now() + self.ban_time);
        record.bad_count = 0;
        tracing::warn!(key_id, "[hc-04] 🚫 sender banned");
    }

    /// Count a bad transaction; returns true when this bans the key.
    pub fn record_bad(&self, key_id: i64) -> bool {
        let reached = {
            let mut keys = self.keys.lock();
            let record = keys.entry(key_id).or_default();
            record.bad_count += 1;
            record.bad_count >= self.threshold
        };
        if reached {
            self.ban(key_id);
        }
        reached
    }

    pub fn is_banned(&self, key_id: i64) -> bool {
        let mut keys = self.keys.lock();
        match keys.get(&key_id).and_then(|r| r.banned_until) {
            Some(until) if until > Instant::now() => true,
            Some(_) => {
                keys.remove(&key_id);
                false
            }
            None => false,
        }
    }

    /// Currently banned keys.
    pub fn banned(&self) -> Vec<i64> {
        let now = Instant::now();
        let mut list: Vec<i64> = self
            .keys
            .lock()
            .iter()
            .filter(|(_, r)| r.banned_until.is_some_and(|u| u > now))
            .map(|(k, _)| *k)
            .collect();
        list.sort_unstable();
        list
    }
}
