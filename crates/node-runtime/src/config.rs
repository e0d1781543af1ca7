//! # Node Configuration
//!
//! Unified configuration for the node, read from a TOML file and then
//! overridden by `HC_*` environment variables.
//!
//! ```toml
//! [directories]
//! keys_dir = "/var/lib/honor/keys"
//!
//! [network]
//! tcp_addr = "0.0.0.0:7078"
//! nodes_addr = ["10.0.0.2:7078"]
//!
//! [engine]
//! sys_update_policy = "after_commit"
//! ```
//!
//! Every section has sane defaults, so an empty file is a valid config.

use crate::error::ConfigError;
use hc_05_block_engine::EngineConfig;
use hc_07_dissemination::TransportConfig;
use hc_08_daemons::SupervisorConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the first block inside the keys directory.
pub const FIRST_BLOCK_FILE: &str = "first_block.bin";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub directories: DirectoriesConfig,
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub transport: TransportConfig,
    pub mempool: MempoolConfig,
    pub daemons: DaemonsConfig,
    /// Accepted for compatibility; enabling it fails validation.
    pub redis: RedisConfig,
    pub flags: FlagsConfig,
    pub telemetry: TelemetrySection,
}

/// Where keys, data and the first block live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    /// Holds the hex `PrivateKey` file.
    pub keys_dir: PathBuf,
    /// State snapshot and lock file.
    pub data_dir: PathBuf,
    /// Defaults to `first_block.bin` inside `keys_dir`.
    pub first_block_path: Option<PathBuf>,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from("./data/keys"),
            data_dir: PathBuf::from("./data"),
            first_block_path: None,
        }
    }
}

impl DirectoriesConfig {
    pub fn first_block_path(&self) -> PathBuf {
        self.first_block_path
            .clone()
            .unwrap_or_else(|| self.keys_dir.join(FIRST_BLOCK_FILE))
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Peer protocol listen address.
    pub tcp_addr: String,
    /// Boundary HTTP address, served outside this process.
    pub http_addr: String,
    /// Bootstrap peers, `ip:port`.
    pub nodes_addr: Vec<String>,
    pub network_id: i64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_addr: "127.0.0.1:7078".into(),
            http_addr: "127.0.0.1:7079".into(),
            nodes_addr: Vec::new(),
            network_id: 1,
        }
    }
}

/// Where committed state is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Directory(PathBuf),
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `memory:` or `file:<dir>`. Unset means a snapshot in `data_dir`.
    pub dsn: Option<String>,
    pub lock_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            lock_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn location(&self, data_dir: &Path) -> Result<StoreLocation, ConfigError> {
        match self.dsn.as_deref() {
            None => Ok(StoreLocation::Directory(data_dir.to_path_buf())),
            Some("memory:") => Ok(StoreLocation::Memory),
            Some(dsn) => match dsn.strip_prefix("file:") {
                Some(dir) if !dir.is_empty() => Ok(StoreLocation::Directory(PathBuf::from(dir))),
                _ => Err(ConfigError::UnsupportedDsn(dsn.to_string())),
            },
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Sender bans applied at submission and during play.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Bad transactions before a sender is banned.
    pub ban_threshold: u32,
    pub ban_time_ms: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            ban_threshold: 3,
            ban_time_ms: 15 * 60 * 1000,
        }
    }
}

impl MempoolConfig {
    pub fn ban_time(&self) -> Duration {
        Duration::from_millis(self.ban_time_ms)
    }
}

/// Which daemons run and how they are supervised.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonsConfig {
    /// Empty means every registered daemon.
    pub names: Vec<String>,
    /// Start only block collection, for rollback testing.
    pub test_rollback: bool,
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".into(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlagsConfig {
    pub subnode: bool,
    pub obs: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

impl NodeConfig {
    /// Read `path` if given, apply the environment, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `HC_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("HC_KEYS_DIR") {
            self.directories.keys_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HC_DATA_DIR") {
            self.directories.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HC_FIRST_BLOCK") {
            self.directories.first_block_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HC_TCP_ADDR") {
            self.network.tcp_addr = v;
        }
        if let Some(v) = lookup("HC_HTTP_ADDR") {
            self.network.http_addr = v;
        }
        if let Some(v) = lookup("HC_NODES_ADDR") {
            self.network.nodes_addr = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("HC_NETWORK_ID") {
            self.network.network_id = parse("HC_NETWORK_ID", &v)?;
        }
        if let Some(v) = lookup("HC_DB_DSN") {
            self.database.dsn = Some(v);
        }
        if let Some(v) = lookup("HC_TEST_ROLLBACK") {
            self.daemons.test_rollback = parse_flag("HC_TEST_ROLLBACK", &v)?;
        }
        if let Some(v) = lookup("HC_SUBNODE") {
            self.flags.subnode = parse_flag("HC_SUBNODE", &v)?;
        }
        if let Some(v) = lookup("HC_REDIS_ENABLED") {
            self.redis.enabled = parse_flag("HC_REDIS_ENABLED", &v)?;
        }
        if let Some(v) = lookup("HC_REDIS_HOST") {
            self.redis.host = v;
        }
        if let Some(v) = lookup("HC_REDIS_PORT") {
            self.redis.port = parse("HC_REDIS_PORT", &v)?;
        }
        if let Some(v) = lookup("HC_REDIS_PASSWORD") {
            self.redis.password = v;
        }
        if let Some(v) = lookup("HC_REDIS_DB") {
            self.redis.db = parse("HC_REDIS_DB", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis.enabled {
            return Err(ConfigError::RedisUnsupported);
        }
        self.network
            .tcp_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddress {
                name: "network.tcp_addr",
                value: self.network.tcp_addr.clone(),
            })?;
        if self.network.network_id <= 0 {
            return Err(ConfigError::InvalidValue {
                name: "network.network_id",
                value: self.network.network_id.to_string(),
            });
        }
        self.database.location(&self.directories.data_dir)?;
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
