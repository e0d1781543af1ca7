//! Outbound ports: what the engine needs from its environment.

/// Wall clock used for the future-time check.
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in seconds.
    fn now(&self) -> i64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}
