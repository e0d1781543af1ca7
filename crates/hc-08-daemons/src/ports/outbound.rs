//! Outbound Ports (Driven Ports)

use crate::domain::DaemonContext;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A named background job. The supervisor calls [`run`](Daemon::run) in a
/// loop, sleeping [`sleep_time`](Daemon::sleep_time) between iterations.
#[async_trait]
pub trait Daemon: Send + Sync {
    fn name(&self) -> &'static str;

    fn sleep_time(&self) -> Duration;

    /// One iteration. Errors are logged and the loop carries on.
    async fn run(&self, ctx: &DaemonContext) -> Result<()>;
}

/// Whether the database answers.
pub trait DbProbe: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Does nothing, sleeps a second.
#[cfg(test)]
pub struct NamedDaemon(pub &'static str);

#[cfg(test)]
#[async_trait]
impl Daemon for NamedDaemon {
    fn name(&self) -> &'static str {
        self.0
    }

    fn sleep_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn run(&self, _ctx: &DaemonContext) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MockProbe {
    pub down: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl DbProbe for MockProbe {
    fn is_available(&self) -> bool {
        !self.down.load(std::sync::atomic::Ordering::SeqCst)
    }
}
