//! # Heartbeats
//!
//! Every loop tick sends `(name, unix seconds)` on a bounded channel. The
//! sender never waits: a full channel drops the beat. The watchdog keeps the
//! last beat per daemon and periodically logs daemons that went quiet.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

pub const HEARTBEAT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub name: &'static str,
    pub at: i64,
}

/// Non-blocking send. Returns false when the beat was dropped.
pub fn beat(tx: &mpsc::Sender<Heartbeat>, name: &'static str) -> bool {
    tx.try_send(Heartbeat { name, at: unix_now() }).is_ok()
}

#[derive(Debug, Default)]
pub struct Watchdog {
    last: HashMap<&'static str, i64>,
    stale_after_secs: i64,
}

impl Watchdog {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            last: HashMap::new(),
            stale_after_secs: stale_after.as_secs() as i64,
        }
    }

    pub fn record(&mut self, beat: Heartbeat) {
        let entry = self.last.entry(beat.name).or_insert(beat.at);
        *entry = (*entry).max(beat.at);
    }

    pub fn last_beat(&self, name: &str) -> Option<i64> {
        self.last.get(name).copied()
    }

    /// Daemons whose last beat is older than the stale threshold, sorted.
    pub fn stale(&self, now: i64) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .last
            .iter()
            .filter(|(_, at)| now - **at > self.stale_after_secs)
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Drain heartbeats until shutdown, logging stale daemons every `period`.
pub async fn run_watchdog(
    mut beats: mpsc::Receiver<Heartbeat>,
    period: Duration,
    stale_after: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut watchdog = Watchdog::new(stale_after);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            beat = beats.recv() => match beat {
                Some(beat) => watchdog.record(beat),
                None => break,
            },
            _ = ticker.tick() => {
                let stale = watchdog.stale(unix_now());
                if !stale.is_empty() {
                    warn!(daemons = ?stale, "[hc-08] ⚠️ stale daemons");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("[hc-08] watchdog stopped");
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
