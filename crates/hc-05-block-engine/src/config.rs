//! Configuration types for the block engine

use serde::Deserialize;

/// When the parameter cache is reloaded after a block changed parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SysUpdatePolicy {
    /// Reload from committed state once the block is committed.
    #[default]
    AfterCommit,
    /// Reload from the block's own transaction before commit; reload again
    /// from committed state if the commit fails.
    InsideTransaction,
}

/// Runtime configuration for the block engine
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sys_update_policy: SysUpdatePolicy,

    /// Refuse received blocks larger than `max_block_size` before decoding.
    pub check_block_size: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sys_update_policy: SysUpdatePolicy::AfterCommit,
            check_block_size: true,
        }
    }
}
