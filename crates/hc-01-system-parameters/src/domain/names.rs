//! Names of the rows of `system_parameters`.

pub const NUMBER_OF_NODES: &str = "number_of_nodes";
pub const FUEL_RATE: &str = "fuel_rate";
pub const HONOR_NODES: &str = "honor_nodes";
pub const MAX_COLUMNS: &str = "max_columns";
pub const MAX_INDEXES: &str = "max_indexes";
/// Maximum transactions of one sender in one block.
pub const MAX_BLOCK_USER_TX: &str = "max_tx_block_per_user";
/// Fuel cost of 1024 bytes of transaction data.
pub const PRICE_TX_DATA: &str = "price_tx_data";
pub const TAXES_WALLET: &str = "taxes_wallet";
/// How far back a fork may be rolled back.
pub const ROLLBACK_BLOCKS: &str = "rollback_blocks";
pub const BLOCK_REWARD: &str = "block_reward";
/// Incorrect blocks tolerated per day before the global ban.
pub const INCORRECT_BLOCKS_PER_DAY: &str = "incorrect_blocks_per_day";
/// Milliseconds.
pub const NODE_BAN_TIME: &str = "node_ban_time";
/// Milliseconds.
pub const LOCAL_NODE_BAN_TIME: &str = "local_node_ban_time";
pub const TAXES_SIZE: &str = "taxes_size";
pub const PRICE_TX_SIZE_WALLET: &str = "price_tx_size_wallet";
pub const PRICE_CREATE_RATE: &str = "price_create_rate";
pub const TEST: &str = "test";
pub const PRIVATE_BLOCKCHAIN: &str = "private_blockchain";

pub const MAX_BLOCK_SIZE: &str = "max_block_size";
pub const MAX_BLOCK_FUEL: &str = "max_block_fuel";
pub const MAX_TX_FUEL: &str = "max_tx_fuel";
/// Milliseconds.
pub const MAX_BLOCK_GENERATION_TIME: &str = "max_block_generation_time";
pub const MAX_TX_SIZE: &str = "max_tx_size";
pub const MAX_FORSIGN_SIZE: &str = "max_forsign_size";
/// Seconds.
pub const GAP_BETWEEN_BLOCKS: &str = "gap_between_blocks";
pub const MAX_TX_BLOCK: &str = "max_tx_block";
pub const MAX_TX_COUNT: &str = "max_tx_count";

/// Prefix of per-contract execution prices.
pub const PRICE_EXEC: &str = "price_exec_";
/// Prefix of per-contract caller restrictions.
pub const ACCESS_EXEC: &str = "access_exec_";

/// Fuel budget of one transaction when `max_tx_fuel` is unset.
pub const COST_DEFAULT: i64 = 20_000_000;
