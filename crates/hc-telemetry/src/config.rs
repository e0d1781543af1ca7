//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable console output (for development)
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,

    /// Network identifier (testnet, mainnet, devnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "honor-chain".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_port: 9100,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HC_SERVICE_NAME`: Service name (default: honor-chain)
    /// - `HC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `HC_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `HC_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `HC_METRICS_PORT`: Prometheus metrics port (default: 9100)
    /// - `HC_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("HC_SERVICE_NAME")
                .unwrap_or_else(|_| "honor-chain".to_string()),

            log_level: env::var("HC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("HC_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("HC_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(is_container),

            metrics_port: env::var("HC_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9100),

            network: env::var("HC_NETWORK").unwrap_or_else(|_| "testnet".to_string()),
        }
    }

    /// Service name suffixed with the network, e.g. `honor-chain-testnet`.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}

/// `true`/`1`/`yes` and `false`/`0`/`no`, anything else yields `default`.
pub(crate) fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "honor-chain");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.metrics_port, 9100);
        assert_eq!(config.full_service_name(), "honor-chain-testnet");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE", false));
        assert!(parse_flag("1", false));
        assert!(!parse_flag("no", true));
        assert!(parse_flag("maybe", true));
    }
}
