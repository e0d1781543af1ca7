//! Values seeded into `system_parameters` by the first block.

use super::names::*;

/// Default parameter set of a fresh network.
pub const DEFAULT_PARAMETERS: &[(&str, &str)] = &[
    (NUMBER_OF_NODES, "101"),
    (FUEL_RATE, r#"[["1","1000000000000"]]"#),
    (HONOR_NODES, ""),
    (MAX_COLUMNS, "50"),
    (MAX_INDEXES, "5"),
    (MAX_BLOCK_USER_TX, "100"),
    (PRICE_TX_DATA, "10"),
    (TAXES_WALLET, r#"[["1","0"]]"#),
    (ROLLBACK_BLOCKS, "60"),
    (BLOCK_REWARD, "1000"),
    (INCORRECT_BLOCKS_PER_DAY, "10"),
    (NODE_BAN_TIME, "86400000"),
    (LOCAL_NODE_BAN_TIME, "1800000"),
    (TAXES_SIZE, "3"),
    (PRICE_TX_SIZE_WALLET, "3000"),
    (PRICE_CREATE_RATE, "1000000"),
    (TEST, "false"),
    (PRIVATE_BLOCKCHAIN, "1"),
    (MAX_BLOCK_SIZE, "67108864"),
    (MAX_BLOCK_FUEL, "200000000000"),
    (MAX_TX_FUEL, "20000000"),
    (MAX_BLOCK_GENERATION_TIME, "2000"),
    (MAX_TX_SIZE, "33554432"),
    (MAX_FORSIGN_SIZE, "1000000"),
    (GAP_BETWEEN_BLOCKS, "2"),
    (MAX_TX_BLOCK, "1000"),
    (MAX_TX_COUNT, "2000"),
];
