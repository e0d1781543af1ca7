//! # Node Events
//!
//! Everything the block pipeline announces after the fact.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, Notification, RejectKind};

/// Events published on the node bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    /// A block was committed and `info_block` advanced.
    BlockCommitted {
        block_id: i64,
        hash: Hash,
        tx_count: usize,
        /// True when this node produced the block.
        generated: bool,
    },

    /// A received block ended in `Rejected`.
    BlockRejected {
        block_id: i64,
        kind: RejectKind,
        /// Whether the producer should be scheduled into the ban service.
        bannable: bool,
        reason: String,
    },

    /// A contract notification, fired after its block committed.
    Notification(Notification),

    /// Blocks were rolled back; `block_id` is the new tip.
    RolledBack { block_id: i64, removed: usize },

    /// A stop-network transaction was played.
    NetworkStopping { block_id: i64 },
}

impl NodeEvent {
    /// Topic this event belongs to.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::BlockCommitted { .. } | Self::BlockRejected { .. } | Self::RolledBack { .. } => {
                EventTopic::Blocks
            }
            Self::Notification(_) => EventTopic::Notifications,
            Self::NetworkStopping { .. } => EventTopic::Lifecycle,
        }
    }
}

/// Event topics for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Blocks,
    Notifications,
    Lifecycle,
    /// Matches every topic.
    All,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NotificationKind;

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Notifications]);
        let note = NodeEvent::Notification(Notification {
            ecosystem_id: 1,
            kind: NotificationKind::Account,
            recipient: 5,
            payload: "paid".into(),
        });
        let committed = NodeEvent::BlockCommitted {
            block_id: 2,
            hash: [0u8; 32],
            tx_count: 1,
            generated: false,
        };
        assert!(filter.matches(&note));
        assert!(!filter.matches(&committed));
        assert!(EventFilter::all().matches(&committed));
    }
}
