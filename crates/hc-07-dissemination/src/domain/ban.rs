//! # Node Ban Service
//!
//! Producers of bad blocks are banned locally for `local_node_ban_time`.
//! More than `incorrect_blocks_per_day` bad blocks inside 24 hours escalate
//! the ban to `node_ban_time`.
//!
//! Banned peers still receive transactions from the dissemination daemon,
//! never blocks.

use hc_01_system_parameters::SystemParameters;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{info, warn};

const DAY_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadBlock {
    pub block_id: i64,
    pub time: i64,
    pub reason: String,
}

#[derive(Debug, Default)]
struct NodeRecord {
    bad_blocks: VecDeque<BadBlock>,
    /// Unix seconds.
    banned_until: i64,
}

impl NodeRecord {
    fn forget_before(&mut self, cutoff: i64) {
        while self.bad_blocks.front().is_some_and(|b| b.time <= cutoff) {
            self.bad_blocks.pop_front();
        }
    }
}

pub struct BanService {
    params: Arc<SystemParameters>,
    /// Keyed by node public key.
    nodes: RwLock<HashMap<Vec<u8>, NodeRecord>>,
}

impl BanService {
    pub fn new(params: Arc<SystemParameters>) -> Self {
        Self {
            params,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Record a bad block produced by `node_key` at unix second `time`.
    /// Returns the ban expiry.
    pub fn register_bad_block(&self, node_key: &[u8], block_id: i64, time: i64, reason: &str) -> i64 {
        let threshold = self.params.incorrect_blocks_per_day();
        let local = self.params.local_node_ban_time().as_secs() as i64;
        let global = self.params.node_ban_time().as_secs() as i64;

        let mut nodes = self.nodes.write();
        let record = nodes.entry(node_key.to_vec()).or_default();
        record.forget_before(time - DAY_SECS);
        record.bad_blocks.push_back(BadBlock {
            block_id,
            time,
            reason: reason.to_string(),
        });

        let escalated = threshold > 0 && record.bad_blocks.len() > threshold;
        let until = time + if escalated { global } else { local };
        record.banned_until = record.banned_until.max(until);

        if escalated {
            warn!(
                node = %hex::encode(node_key),
                bad_blocks = record.bad_blocks.len(),
                until = record.banned_until,
                "[hc-07] 🚫 node banned"
            );
        } else {
            info!(
                node = %hex::encode(node_key),
                block_id,
                reason,
                until = record.banned_until,
                "[hc-07] node banned locally"
            );
        }
        record.banned_until
    }

    pub fn is_banned(&self, node_key: &[u8], now: i64) -> bool {
        self.nodes
            .read()
            .get(node_key)
            .is_some_and(|r| r.banned_until > now)
    }

    /// Split `hosts` into good hosts and hosts of banned nodes. Hosts that do
    /// not belong to a known node count as good.
    pub fn filter_hosts(&self, hosts: Vec<String>, now: i64) -> (Vec<String>, Vec<String>) {
        hosts.into_iter().partition(|host| {
            match self.params.node_by_host(host) {
                Ok(node) => !self.is_banned(&node.public_key, now),
                Err(_) => true,
            }
        })
    }

    /// Hex keys of currently banned nodes.
    pub fn ban_list(&self, now: i64) -> Vec<String> {
        let mut keys: Vec<String> = self
            .nodes
            .read()
            .iter()
            .filter(|(_, r)| r.banned_until > now)
            .map(|(k, _)| hex::encode(k))
            .collect();
        keys.sort();
        keys
    }

    pub fn bad_blocks(&self, node_key: &[u8]) -> Vec<BadBlock> {
        self.nodes
            .read()
            .get(node_key)
            .map(|r| r.bad_blocks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop expired bans and bad blocks older than a day.
    pub fn gc(&self, now: i64) -> usize {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|_, r| {
            r.forget_before(now - DAY_SECS);
            r.banned_until > now || !r.bad_blocks.is_empty()
        });
        before - nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_01_system_parameters::{names, DEFAULT_PARAMETERS};
    use hc_02_state_store::Database;

    const T0: i64 = 1_700_000_000;

    fn service(pairs: &[(&str, &str)]) -> BanService {
        let db = Database::in_memory();
        let mut tx = db.begin().unwrap();
        tx.seed_system_parameters(DEFAULT_PARAMETERS.iter().copied());
        for (k, v) in pairs {
            tx.set_system_parameter(k, v);
        }
        let params = SystemParameters::new(vec![], vec![]);
        params.refresh(&tx).unwrap();
        BanService::new(Arc::new(params))
    }

    #[test]
    fn test_local_ban_expires() {
        let bans = service(&[(names::LOCAL_NODE_BAN_TIME, "60000")]);
        let until = bans.register_bad_block(b"node-a", 7, T0, "bad sign");
        assert_eq!(until, T0 + 60);
        assert!(bans.is_banned(b"node-a", T0 + 59));
        assert!(!bans.is_banned(b"node-a", T0 + 60));
        assert!(!bans.is_banned(b"node-b", T0));
    }

    #[test]
    fn test_repeated_bad_blocks_escalate() {
        let bans = service(&[
            (names::LOCAL_NODE_BAN_TIME, "60000"),
            (names::NODE_BAN_TIME, "3600000"),
            (names::INCORRECT_BLOCKS_PER_DAY, "2"),
        ]);
        bans.register_bad_block(b"node-a", 1, T0, "x");
        bans.register_bad_block(b"node-a", 2, T0 + 1, "x");
        let until = bans.register_bad_block(b"node-a", 3, T0 + 2, "x");
        assert_eq!(until, T0 + 2 + 3600);
        assert_eq!(bans.ban_list(T0 + 100), vec![hex::encode(b"node-a")]);
    }

    #[test]
    fn test_old_bad_blocks_do_not_count() {
        let bans = service(&[(names::INCORRECT_BLOCKS_PER_DAY, "1"), (names::LOCAL_NODE_BAN_TIME, "1000")]);
        bans.register_bad_block(b"node-a", 1, T0, "x");
        let until = bans.register_bad_block(b"node-a", 2, T0 + DAY_SECS + 1, "x");
        assert_eq!(until, T0 + DAY_SECS + 2);
        assert_eq!(bans.bad_blocks(b"node-a").len(), 1);
    }

    #[test]
    fn test_gc_drops_expired() {
        let bans = service(&[(names::LOCAL_NODE_BAN_TIME, "1000")]);
        bans.register_bad_block(b"node-a", 1, T0, "x");
        assert_eq!(bans.gc(T0 + 10), 0);
        assert_eq!(bans.gc(T0 + DAY_SECS + 1), 1);
        assert!(bans.ban_list(T0).is_empty());
    }
}
