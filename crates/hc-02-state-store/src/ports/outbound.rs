//! # Outbound Ports (Driven Side)
//!
//! Where committed snapshots go. The store works without one (pure memory).

use crate::domain::tables::Tables;
use crate::error::Result;

/// Durable home of the committed snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Last saved snapshot, `None` on first start.
    fn load(&self) -> Result<Option<Tables>>;

    /// Replace the saved snapshot. Must be atomic: a crash leaves either the
    /// old or the new snapshot.
    fn save(&self, tables: &Tables) -> Result<()>;
}
