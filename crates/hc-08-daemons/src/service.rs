//! # Supervisor
//!
//! ```text
//!   start(names) ──┬─ watchdog ◄──── heartbeats (mpsc, 100, drop on full)
//!                  │
//!                  └─ per daemon: supervise ──spawn──> loop
//!                                     ▲                  │ wait_db
//!                                     │                  │ beat, run, sleep
//!                                     │ JoinError(panic) │
//!                                     └── backoff ◄──────┘
//!                        restarts exhausted ─> shutdown + Escalated
//! ```
//!
//! A panic inside a handler is logged and counted, then resumed so that it
//! ends the loop task. The supervisor sees the panicked `JoinError` and
//! restarts the loop according to [`RestartPolicy`](crate::RestartPolicy).
//! Every loop reports on the exit channel once it is done; the channel
//! closes after the last one.

use crate::config::SupervisorConfig;
use crate::domain::{beat, run_watchdog, DaemonContext, DaemonRegistry, Heartbeat, HEARTBEAT_CAPACITY};
use crate::error::{DaemonError, Result};
use crate::ports::{Daemon, DbProbe};
use futures::FutureExt;
use hc_telemetry::{DAEMON_ITERATION_DURATION, DAEMON_PANICS};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// A loop that ended, and why.
#[derive(Debug)]
pub struct DaemonExit {
    pub name: &'static str,
    pub result: Result<()>,
}

pub struct Supervisor {
    registry: Arc<DaemonRegistry>,
    probe: Arc<dyn DbProbe>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(registry: Arc<DaemonRegistry>, probe: Arc<dyn DbProbe>, config: SupervisorConfig) -> Self {
        Self {
            registry,
            probe,
            config,
        }
    }

    pub fn registry(&self) -> &DaemonRegistry {
        &self.registry
    }

    /// Launch one supervised loop per known name. Setting `shutdown` to true
    /// stops them all.
    pub fn start(&self, shutdown: Arc<watch::Sender<bool>>, names: &[String]) -> mpsc::Receiver<DaemonExit> {
        let (exit_tx, exit_rx) = mpsc::channel(names.len().max(1));
        let (beat_tx, beat_rx) = mpsc::channel(HEARTBEAT_CAPACITY);

        tokio::spawn(run_watchdog(
            beat_rx,
            self.config.watchdog_period(),
            self.config.stale_after(),
            shutdown.subscribe(),
        ));

        for name in names {
            let Some(daemon) = self.registry.get(name) else {
                warn!(daemon = %name, "[hc-08] unknown daemon, skipping");
                continue;
            };
            tokio::spawn(supervise(
                daemon,
                self.probe.clone(),
                self.config.clone(),
                shutdown.clone(),
                beat_tx.clone(),
                exit_tx.clone(),
            ));
        }
        info!(daemons = ?names, "[hc-08] 🚀 daemons started");
        exit_rx
    }
}

async fn supervise(
    daemon: Arc<dyn Daemon>,
    probe: Arc<dyn DbProbe>,
    config: SupervisorConfig,
    shutdown: Arc<watch::Sender<bool>>,
    beats: mpsc::Sender<Heartbeat>,
    exits: mpsc::Sender<DaemonExit>,
) {
    let name = daemon.name();
    let mut restarts = 0u32;
    let result = loop {
        let ctx = DaemonContext::new(name, shutdown.clone());
        let task = tokio::spawn(run_loop(
            daemon.clone(),
            probe.clone(),
            config.db_wait_interval(),
            ctx.clone(),
            beats.clone(),
        ));
        match task.await {
            Ok(()) => break Ok(()),
            Err(err) if err.is_panic() => {
                if restarts >= config.restart.max_restarts {
                    error!(daemon = name, restarts, "[hc-08] 💥 restarts exhausted, stopping node");
                    shutdown.send_replace(true);
                    break Err(DaemonError::Escalated {
                        name: name.to_string(),
                        restarts,
                    });
                }
                restarts += 1;
                let delay = config.restart.backoff(restarts);
                warn!(daemon = name, restarts, delay_ms = delay.as_millis() as u64, "[hc-08] restarting daemon");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = ctx.cancelled() => break Ok(()),
                }
            }
            Err(err) => {
                warn!(daemon = name, error = %err, "[hc-08] daemon task cancelled");
                break Ok(());
            }
        }
    };
    info!(daemon = name, "[hc-08] daemon stopped");
    if exits.send(DaemonExit { name, result }).await.is_err() {
        warn!(daemon = name, "[hc-08] nobody waits for daemon exits");
    }
}

async fn run_loop(
    daemon: Arc<dyn Daemon>,
    probe: Arc<dyn DbProbe>,
    db_wait: Duration,
    ctx: DaemonContext,
    beats: mpsc::Sender<Heartbeat>,
) {
    let name = daemon.name();
    if !wait_db(probe.as_ref(), db_wait, &ctx).await {
        return;
    }
    info!(daemon = name, "[hc-08] daemon running");

    while !ctx.is_shutting_down() {
        beat(&beats, name);
        let timer = DAEMON_ITERATION_DURATION
            .with_label_values(&[name])
            .start_timer();
        let outcome = AssertUnwindSafe(daemon.run(&ctx)).catch_unwind().await;
        timer.observe_duration();

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(daemon = name, error = %err, "[hc-08] iteration failed"),
            Err(payload) => {
                DAEMON_PANICS.with_label_values(&[name]).inc();
                error!(daemon = name, panic = %panic_message(payload.as_ref()), "[hc-08] 💥 daemon panicked");
                std::panic::resume_unwind(payload);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(daemon.sleep_time()) => {}
            _ = ctx.cancelled() => break,
        }
    }
}

/// Block until the database answers. False if shutdown came first.
pub async fn wait_db(probe: &dyn DbProbe, interval: Duration, ctx: &DaemonContext) -> bool {
    let mut warned = false;
    loop {
        if ctx.is_shutting_down() {
            return false;
        }
        if probe.is_available() {
            return true;
        }
        if !warned {
            warn!(daemon = ctx.name(), "[hc-08] waiting for database");
            warned = true;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = ctx.cancelled() => return false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestartPolicy;
    use crate::ports::MockProbe;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Ok,
        Fail,
        Panic,
        StopNode,
    }

    struct TestDaemon {
        name: &'static str,
        behaviour: Behaviour,
        runs: AtomicUsize,
    }

    impl TestDaemon {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                runs: AtomicUsize::new(0),
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Daemon for TestDaemon {
        fn name(&self) -> &'static str {
            self.name
        }

        fn sleep_time(&self) -> Duration {
            Duration::from_millis(10)
        }

        async fn run(&self, ctx: &DaemonContext) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Ok => Ok(()),
                Behaviour::Fail => Err(DaemonError::handler(self.name, "peer unreachable")),
                Behaviour::Panic => panic!("handler blew up"),
                Behaviour::StopNode => {
                    ctx.request_shutdown();
                    Ok(())
                }
            }
        }
    }

    fn supervisor(daemon: Arc<TestDaemon>, probe: Arc<MockProbe>) -> Supervisor {
        let mut registry = DaemonRegistry::new();
        registry.register(daemon);
        let config = SupervisorConfig {
            db_wait_interval_ms: 100,
            restart: RestartPolicy {
                max_restarts: 2,
                backoff_ms: 10,
            },
            ..Default::default()
        };
        Supervisor::new(Arc::new(registry), probe, config)
    }

    fn shutdown() -> Arc<watch::Sender<bool>> {
        Arc::new(watch::channel(false).0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_shutdown() {
        let daemon = TestDaemon::new("Ticker", Behaviour::Ok);
        let sup = supervisor(daemon.clone(), Arc::default());
        let stop = shutdown();
        let mut exits = sup.start(stop.clone(), &["Ticker".to_string()]);

        tokio::time::sleep(Duration::from_millis(55)).await;
        stop.send_replace(true);

        let exit = exits.recv().await.unwrap();
        assert_eq!(exit.name, "Ticker");
        assert!(exit.result.is_ok());
        assert!(exits.recv().await.is_none());
        assert!(daemon.runs() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_names_are_skipped() {
        let sup = supervisor(TestDaemon::new("Ticker", Behaviour::Ok), Arc::default());
        let mut exits = sup.start(shutdown(), &["Nope".to_string()]);
        assert!(exits.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_errors_keep_the_loop_alive() {
        let daemon = TestDaemon::new("Flaky", Behaviour::Fail);
        let sup = supervisor(daemon.clone(), Arc::default());
        let stop = shutdown();
        let mut exits = sup.start(stop.clone(), &["Flaky".to_string()]);

        tokio::time::sleep(Duration::from_millis(35)).await;
        stop.send_replace(true);
        assert!(exits.recv().await.unwrap().result.is_ok());
        assert!(daemon.runs() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panics_restart_then_escalate() {
        let daemon = TestDaemon::new("Panicker", Behaviour::Panic);
        let sup = supervisor(daemon.clone(), Arc::default());
        let stop = shutdown();
        let mut exits = sup.start(stop.clone(), &["Panicker".to_string()]);

        let exit = exits.recv().await.unwrap();
        assert!(matches!(
            exit.result,
            Err(DaemonError::Escalated { restarts: 2, .. })
        ));
        // first run plus two restarts
        assert_eq!(daemon.runs(), 3);
        assert!(*stop.borrow());
        assert!(DAEMON_PANICS.with_label_values(&["Panicker"]).get() >= 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_database() {
        let daemon = TestDaemon::new("Patient", Behaviour::Ok);
        let probe = Arc::new(MockProbe::default());
        probe.down.store(true, Ordering::SeqCst);
        let sup = supervisor(daemon.clone(), probe.clone());
        let stop = shutdown();
        let mut exits = sup.start(stop.clone(), &["Patient".to_string()]);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(daemon.runs(), 0);

        probe.down.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(daemon.runs() > 0);

        stop.send_replace(true);
        assert!(exits.recv().await.unwrap().result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_can_stop_the_node() {
        let daemon = TestDaemon::new("Stopper", Behaviour::StopNode);
        let sup = supervisor(daemon.clone(), Arc::default());
        let stop = shutdown();
        let mut exits = sup.start(stop.clone(), &["Stopper".to_string()]);

        assert!(exits.recv().await.unwrap().result.is_ok());
        assert!(*stop.borrow());
        assert_eq!(daemon.runs(), 1);
    }
}
