//! Daemon registry: name to handler.

use crate::ports::Daemon;
use std::sync::Arc;
use tracing::warn;

/// Daemons that still run when the node is started for a test rollback.
pub const ROLLBACK_LIST: &[&str] = &["BlocksCollection"];

#[derive(Default)]
pub struct DaemonRegistry {
    daemons: Vec<Arc<dyn Daemon>>,
}

impl DaemonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a daemon. A later registration under the same name wins.
    pub fn register(&mut self, daemon: Arc<dyn Daemon>) {
        if let Some(slot) = self.daemons.iter_mut().find(|d| d.name() == daemon.name()) {
            warn!(daemon = daemon.name(), "[hc-08] daemon registered twice");
            *slot = daemon;
            return;
        }
        self.daemons.push(daemon);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Daemon>> {
        self.daemons.iter().find(|d| d.name() == name).cloned()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.daemons.iter().map(|d| d.name()).collect()
    }

    pub fn rollback_list(&self) -> Vec<&'static str> {
        self.names()
            .into_iter()
            .filter(|n| ROLLBACK_LIST.contains(n))
            .collect()
    }

    /// The daemons a node starts by default.
    pub fn select(&self, test_rollback: bool) -> Vec<String> {
        let names = if test_rollback { self.rollback_list() } else { self.names() };
        names.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NamedDaemon;

    #[test]
    fn test_register_and_select() {
        let mut registry = DaemonRegistry::new();
        registry.register(Arc::new(NamedDaemon("Disseminator")));
        registry.register(Arc::new(NamedDaemon("BlocksCollection")));
        registry.register(Arc::new(NamedDaemon("Disseminator")));

        assert_eq!(registry.names(), vec!["Disseminator", "BlocksCollection"]);
        assert_eq!(registry.select(true), vec!["BlocksCollection".to_string()]);
        assert_eq!(registry.select(false).len(), 2);
        assert!(registry.get("QueueParserTx").is_none());
    }
}
