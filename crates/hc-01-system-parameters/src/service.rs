//! # Parameter Cache Service
//!
//! [`SystemParameters`] holds the last loaded copy of `system_parameters`
//! together with the structures derived from it. Readers take the read lock;
//! [`SystemParameters::refresh`] holds the write lock while it reads and parses
//! a complete new state, then swaps it in, so a failed refresh leaves the old
//! state. Which snapshot a caller passes is its own business: the node
//! serializes commits and reloads under its database lock.

use crate::domain::names::*;
use crate::domain::nodes::{parse_ecosystem_pairs, HonorNodeSet};
use crate::error::{ParamError, Result};
use hc_02_state_store::Tables;
use parking_lot::RwLock;
use shared_types::{FirstBlockData, HonorNode, LookupError};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct ParamState {
    values: BTreeMap<String, String>,
    nodes: HonorNodeSet,
    fuels: BTreeMap<i64, String>,
    wallets: BTreeMap<i64, String>,
    first_block: Option<FirstBlockData>,
}

impl ParamState {
    /// With no declared honor nodes the first-block signer is position 0.
    fn apply_first_block_fallback(&mut self) {
        if self.nodes.is_empty() {
            if let Some(first) = &self.first_block {
                self.nodes = HonorNodeSet::single(first.node_public_key.clone());
            }
        }
    }
}

/// Process-wide cache of blockchain parameters.
#[derive(Debug)]
pub struct SystemParameters {
    state: RwLock<ParamState>,
    node_public_key: RwLock<Vec<u8>>,
    /// Configured bootstrap addresses, used when no peer is known.
    bootstrap_hosts: Vec<String>,
}

impl SystemParameters {
    pub fn new(node_public_key: Vec<u8>, bootstrap_hosts: Vec<String>) -> Self {
        Self {
            state: RwLock::new(ParamState::default()),
            node_public_key: RwLock::new(node_public_key),
            bootstrap_hosts,
        }
    }

    /// Reload every parameter from `tables` and reparse the derived maps.
    pub fn refresh(&self, tables: &Tables) -> Result<()> {
        let mut state = self.state.write();
        let values = tables.system_parameters().clone();
        let nodes = HonorNodeSet::parse(values.get(HONOR_NODES).map(String::as_str).unwrap_or(""))?;
        let fuels = parse_ecosystem_pairs(FUEL_RATE, values.get(FUEL_RATE).map(String::as_str).unwrap_or(""))?;
        let wallets = parse_ecosystem_pairs(
            TAXES_WALLET,
            values.get(TAXES_WALLET).map(String::as_str).unwrap_or(""),
        )?;

        let first_block = state.first_block.take();
        *state = ParamState {
            values,
            nodes,
            fuels,
            wallets,
            first_block,
        };
        state.apply_first_block_fallback();
        info!(
            params = state.values.len(),
            honor_nodes = state.nodes.active().len(),
            "[hc-01] system parameters refreshed"
        );
        Ok(())
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================

    /// Value of a parameter, empty when unset.
    pub fn get(&self, name: &str) -> String {
        self.state.read().values.get(name).cloned().unwrap_or_default()
    }

    pub fn get_required(&self, name: &str) -> Result<String> {
        self.state
            .read()
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::ParamNotFound(name.to_string()).into())
    }

    pub fn has(&self, name: &str) -> bool {
        self.state.read().values.contains_key(name)
    }

    /// Integer value, zero when unset or not a number.
    pub fn get_int(&self, name: &str) -> i64 {
        self.state
            .read()
            .values
            .get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// A parameter holding milliseconds.
    pub fn get_duration_ms(&self, name: &str) -> Duration {
        Duration::from_millis(self.get_int(name).max(0) as u64)
    }

    fn get_usize(&self, name: &str) -> usize {
        self.get_int(name).max(0) as usize
    }

    fn get_flag(&self, name: &str) -> bool {
        matches!(self.get(name).as_str(), "true" | "1")
    }

    // =========================================================================
    // LIMITS
    // =========================================================================

    pub fn max_block_size(&self) -> i64 {
        self.get_int(MAX_BLOCK_SIZE)
    }

    pub fn max_block_fuel(&self) -> i64 {
        self.get_int(MAX_BLOCK_FUEL)
    }

    pub fn max_tx_fuel(&self) -> i64 {
        self.get_int(MAX_TX_FUEL)
    }

    pub fn max_block_generation_time(&self) -> Duration {
        self.get_duration_ms(MAX_BLOCK_GENERATION_TIME)
    }

    pub fn max_tx_size(&self) -> i64 {
        self.get_int(MAX_TX_SIZE)
    }

    pub fn max_forsign_size(&self) -> i64 {
        self.get_int(MAX_FORSIGN_SIZE)
    }

    /// Seconds between the end of one slot's generation window and the next.
    pub fn gap_between_blocks(&self) -> i64 {
        self.get_int(GAP_BETWEEN_BLOCKS)
    }

    pub fn max_tx_block(&self) -> usize {
        self.get_usize(MAX_TX_BLOCK)
    }

    pub fn max_tx_count(&self) -> usize {
        self.get_usize(MAX_TX_COUNT)
    }

    pub fn max_block_user_tx(&self) -> usize {
        self.get_usize(MAX_BLOCK_USER_TX)
    }

    pub fn max_columns(&self) -> usize {
        self.get_usize(MAX_COLUMNS)
    }

    pub fn max_indexes(&self) -> usize {
        self.get_usize(MAX_INDEXES)
    }

    pub fn price_tx_data(&self) -> i64 {
        self.get_int(PRICE_TX_DATA)
    }

    pub fn rollback_blocks(&self) -> i64 {
        self.get_int(ROLLBACK_BLOCKS)
    }

    pub fn incorrect_blocks_per_day(&self) -> usize {
        self.get_usize(INCORRECT_BLOCKS_PER_DAY)
    }

    pub fn node_ban_time(&self) -> Duration {
        self.get_duration_ms(NODE_BAN_TIME)
    }

    pub fn local_node_ban_time(&self) -> Duration {
        self.get_duration_ms(LOCAL_NODE_BAN_TIME)
    }

    pub fn is_test_mode(&self) -> bool {
        self.get_flag(TEST)
    }

    /// Anything but empty, `0` or `false` counts as private.
    pub fn is_private_blockchain(&self) -> bool {
        let value = self.get(PRIVATE_BLOCKCHAIN);
        !value.is_empty() && value != "0" && value != "false"
    }

    /// Fuel budget of one transaction.
    pub fn max_cost(&self) -> i64 {
        match self.max_tx_fuel() {
            0 => COST_DEFAULT,
            cost => cost,
        }
    }

    /// Configured execution price of a contract, if any.
    pub fn price_exec(&self, contract: &str) -> Option<i64> {
        let name = format!("{PRICE_EXEC}{contract}");
        self.has(&name).then(|| self.get_int(&name))
    }

    /// Key id allowed to call a contract, if restricted.
    pub fn access_exec(&self, contract: &str) -> Option<String> {
        let value = self.get(&format!("{ACCESS_EXEC}{contract}"));
        (!value.is_empty()).then_some(value)
    }

    /// Fuel rate of an ecosystem, falling back to ecosystem 1.
    pub fn fuel_rate(&self, ecosystem: i64) -> Option<String> {
        let state = self.state.read();
        state
            .fuels
            .get(&ecosystem)
            .or_else(|| state.fuels.get(&1))
            .cloned()
    }

    /// Taxes wallet of an ecosystem, falling back to ecosystem 1.
    pub fn taxes_wallet(&self, ecosystem: i64) -> Option<String> {
        let state = self.state.read();
        state
            .wallets
            .get(&ecosystem)
            .or_else(|| state.wallets.get(&1))
            .cloned()
    }

    // =========================================================================
    // HONOR NODES
    // =========================================================================

    pub fn node_public_key(&self) -> Vec<u8> {
        self.node_public_key.read().clone()
    }

    pub fn set_node_public_key(&self, public_key: Vec<u8>) {
        *self.node_public_key.write() = public_key;
    }

    /// Active honor nodes in position order.
    pub fn nodes(&self) -> Vec<HonorNode> {
        self.state.read().nodes.active().to_vec()
    }

    /// Count of active honor nodes.
    pub fn number_of_nodes(&self) -> i64 {
        self.state.read().nodes.active().len() as i64
    }

    pub fn node_by_position(&self, position: i64) -> Result<HonorNode> {
        self.state.read().nodes.by_position(position).cloned()
    }

    pub fn node_public_key_by_position(&self, position: i64) -> Result<Vec<u8>> {
        Ok(self.node_by_position(position)?.public_key)
    }

    pub fn node_position_by_public_key(&self, public_key: &[u8]) -> Result<i64> {
        self.state.read().nodes.position_of(public_key)
    }

    pub fn this_node_position(&self) -> Result<i64> {
        let own = self.node_public_key();
        self.node_position_by_public_key(&own)
    }

    /// Whether this node currently holds a position.
    pub fn is_honor_node(&self) -> bool {
        self.this_node_position().is_ok()
    }

    pub fn node_by_host(&self, host: &str) -> Result<HonorNode> {
        self.state
            .read()
            .nodes
            .by_host(host)
            .cloned()
            .ok_or_else(|| ParamError::IncorrectHost(host.to_string()))
    }

    /// Active peers excluding this node.
    pub fn remote_hosts(&self) -> Vec<String> {
        let own = self.node_public_key();
        self.state.read().nodes.remote_hosts(&own)
    }

    /// Like [`remote_hosts`](Self::remote_hosts), falling back to the first
    /// bootstrap address.
    pub fn default_remote_hosts(&self) -> Vec<String> {
        let hosts = self.remote_hosts();
        if hosts.is_empty() {
            return self.bootstrap_hosts.iter().take(1).cloned().collect();
        }
        hosts
    }

    pub fn bootstrap_hosts(&self) -> &[String] {
        &self.bootstrap_hosts
    }

    // =========================================================================
    // FIRST BLOCK
    // =========================================================================

    /// Remember the first block. With no declared honor nodes its signer
    /// becomes position 0.
    pub fn set_first_block_data(&self, data: FirstBlockData) {
        let mut state = self.state.write();
        state.first_block = Some(data);
        state.apply_first_block_fallback();
    }

    pub fn first_block_data(&self) -> Result<FirstBlockData> {
        self.state
            .read()
            .first_block
            .clone()
            .ok_or(ParamError::FirstBlockData)
    }
}

/// Number of declared honor nodes straight from the table, 1 when none are
/// declared: the first-block signer then produces alone.
pub fn number_of_nodes_from_db(tables: &Tables) -> i64 {
    let value = tables.system_parameter(HONOR_NODES).unwrap_or("");
    if value.trim().is_empty() {
        return 1;
    }
    match serde_json::from_str::<Vec<serde_json::Value>>(value) {
        Ok(nodes) if !nodes.is_empty() => nodes.len() as i64,
        Ok(_) => 1,
        Err(e) => {
            warn!(error = %e, "[hc-01] unmarshalling honor nodes from JSON");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_02_state_store::Database;

    fn seeded(params: &[(&str, &str)]) -> Database {
        let db = Database::in_memory();
        let mut tx = db.begin().unwrap();
        for (k, v) in params {
            tx.set_system_parameter(k, v);
        }
        tx.commit().unwrap();
        db
    }

    const NODES: &str = r#"[
        {"tcp_address":"a:1","public_key":"aa"},
        {"tcp_address":"b:1","public_key":"bb"}
    ]"#;

    #[test]
    fn test_refresh_and_getters() {
        let db = seeded(&[
            (MAX_TX_SIZE, "1024"),
            (MAX_BLOCK_GENERATION_TIME, "1500"),
            (TEST, "1"),
            (FUEL_RATE, r#"[["1","10"],["3","30"]]"#),
            (HONOR_NODES, NODES),
        ]);
        let params = SystemParameters::new(vec![0xaa], vec![]);
        db.read(|t| params.refresh(t)).unwrap();

        assert_eq!(params.max_tx_size(), 1024);
        assert_eq!(params.max_block_generation_time(), Duration::from_millis(1500));
        assert!(params.is_test_mode());
        assert_eq!(params.fuel_rate(3).as_deref(), Some("30"));
        assert_eq!(params.fuel_rate(7).as_deref(), Some("10"));
        assert_eq!(params.this_node_position().unwrap(), 0);
        assert_eq!(params.remote_hosts(), vec!["b:1".to_string()]);
        assert!(matches!(
            params.get_required("nope"),
            Err(ParamError::Lookup(LookupError::ParamNotFound(_)))
        ));
    }

    #[test]
    fn test_failed_refresh_keeps_old_state() {
        let params = SystemParameters::new(vec![], vec![]);
        seeded(&[(GAP_BETWEEN_BLOCKS, "4")])
            .read(|t| params.refresh(t))
            .unwrap();

        let bad = seeded(&[(HONOR_NODES, r#"[{"public_key":"aa"},{"public_key":"aa"}]"#)]);
        assert!(matches!(
            bad.read(|t| params.refresh(t)),
            Err(ParamError::DuplicateHonorNode(_))
        ));
        assert_eq!(params.gap_between_blocks(), 4);
    }

    #[test]
    fn test_concurrent_refreshes_swap_whole_states() {
        let one = seeded(&[(HONOR_NODES, r#"[{"tcp_address":"a:1","public_key":"aa"}]"#)]);
        let two = seeded(&[(HONOR_NODES, NODES)]);
        let params = std::sync::Arc::new(SystemParameters::new(vec![], vec![]));

        std::thread::scope(|scope| {
            for db in [&one, &two, &one, &two] {
                let params = params.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        db.read(|t| params.refresh(t)).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..800 {
                    let state = params.state.read();
                    let declared = HonorNodeSet::parse(state.values.get(HONOR_NODES).map(String::as_str).unwrap_or(""))
                        .unwrap()
                        .active()
                        .len();
                    assert_eq!(state.nodes.active().len(), declared);
                }
            });
        });

        one.read(|t| params.refresh(t)).unwrap();
        assert_eq!(params.number_of_nodes(), 1);
    }

    #[test]
    fn test_max_cost_default() {
        let params = SystemParameters::new(vec![], vec![]);
        assert_eq!(params.max_cost(), COST_DEFAULT);
        seeded(&[(MAX_TX_FUEL, "500")]).read(|t| params.refresh(t)).unwrap();
        assert_eq!(params.max_cost(), 500);
    }

    #[test]
    fn test_price_and_access_exec() {
        let params = SystemParameters::new(vec![], vec![]);
        seeded(&[("price_exec_MoneyTransfer", "0"), ("access_exec_Secret", "42")])
            .read(|t| params.refresh(t))
            .unwrap();
        assert_eq!(params.price_exec("MoneyTransfer"), Some(0));
        assert_eq!(params.price_exec("Other"), None);
        assert_eq!(params.access_exec("Secret").as_deref(), Some("42"));
        assert_eq!(params.access_exec("MoneyTransfer"), None);
    }

    #[test]
    fn test_first_block_signer_is_position_zero() {
        let params = SystemParameters::new(vec![0x07], vec!["boot:7078".into()]);
        assert!(!params.is_honor_node());
        params.set_first_block_data(FirstBlockData {
            node_public_key: vec![0x07],
            ..Default::default()
        });
        assert_eq!(params.this_node_position().unwrap(), 0);
        assert_eq!(params.number_of_nodes(), 1);

        // refresh with still-empty honor_nodes keeps the fallback
        Database::in_memory().read(|t| params.refresh(t)).unwrap();
        assert!(params.is_honor_node());
        assert_eq!(params.default_remote_hosts(), vec!["boot:7078".to_string()]);
    }

    #[test]
    fn test_number_of_nodes_from_db() {
        assert_eq!(Database::in_memory().read(number_of_nodes_from_db), 1);
        assert_eq!(seeded(&[(HONOR_NODES, "[]")]).read(number_of_nodes_from_db), 1);
        assert_eq!(seeded(&[(HONOR_NODES, NODES)]).read(number_of_nodes_from_db), 2);
    }

    #[test]
    fn test_private_blockchain_flag() {
        let params = SystemParameters::new(vec![], vec![]);
        assert!(!params.is_private_blockchain());
        seeded(&[(PRIVATE_BLOCKCHAIN, "false")]).read(|t| params.refresh(t)).unwrap();
        assert!(!params.is_private_blockchain());
        seeded(&[(PRIVATE_BLOCKCHAIN, "yes")]).read(|t| params.refresh(t)).unwrap();
        assert!(params.is_private_blockchain());
    }
}
