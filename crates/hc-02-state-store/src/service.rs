//! # Database Service
//!
//! [`Database`] owns the committed snapshot; [`DbTransaction`] is a private
//! working copy with a stack of named savepoints.

use crate::domain::tables::Tables;
use crate::error::{DbError, Result};
use crate::ports::outbound::SnapshotStore;
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

struct Committed {
    version: u64,
    tables: Tables,
}

struct Inner {
    committed: RwLock<Committed>,
    store: Option<Arc<dyn SnapshotStore>>,
    closed: AtomicBool,
}

/// Handle on the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), None)
    }

    /// Open a store backed by a snapshot, loading the last committed state.
    pub fn open(store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let tables = store.load()?.unwrap_or_default();
        info!(
            "[hc-02] 💾 Opened state store, tip block {}",
            tables.info_block.as_ref().map(|i| i.block_id).unwrap_or(0)
        );
        Ok(Self::with_tables(tables, Some(store)))
    }

    fn with_tables(tables: Tables, store: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                committed: RwLock::new(Committed { version: 0, tables }),
                store,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Start a transaction on a private copy of the committed state.
    pub fn begin(&self) -> Result<DbTransaction> {
        self.ping()?;
        let committed = self.inner.committed.read();
        Ok(DbTransaction {
            db: self.clone(),
            base_version: committed.version,
            working: committed.tables.clone(),
            savepoints: Vec::new(),
            finished: false,
        })
    }

    /// Run a read-only closure against the committed snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.inner.committed.read().tables)
    }

    /// Clone of the committed snapshot.
    pub fn snapshot(&self) -> Tables {
        self.inner.committed.read().tables.clone()
    }

    /// Number of commits since open.
    pub fn version(&self) -> u64 {
        self.inner.committed.read().version
    }

    /// Fails once the store has been closed.
    pub fn ping(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DbError::Closed);
        }
        Ok(())
    }

    /// Refuse new transactions. Pending ones can still commit.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    /// Reopen a closed store.
    pub fn reopen(&self) {
        self.inner.closed.store(false, Ordering::Release);
    }
}

/// A database transaction with nested named savepoints.
///
/// Dropping without [`commit`](DbTransaction::commit) discards all changes.
pub struct DbTransaction {
    db: Database,
    base_version: u64,
    working: Tables,
    savepoints: Vec<(String, Tables)>,
    finished: bool,
}

impl Deref for DbTransaction {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.working
    }
}

impl DbTransaction {
    pub(crate) fn tables_mut(&mut self) -> &mut Tables {
        &mut self.working
    }

    /// Establish a savepoint. Names may repeat; the newest one wins.
    pub fn savepoint(&mut self, name: &str) {
        self.savepoints.push((name.to_string(), self.working.clone()));
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| DbError::SavepointNotFound(name.to_string()))
    }

    /// Forget a savepoint and every savepoint established after it, keeping
    /// the changes.
    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name)?;
        self.savepoints.truncate(idx);
        Ok(())
    }

    /// Undo every change made since the savepoint. The savepoint itself stays
    /// established, later ones are destroyed.
    pub fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name)?;
        self.working = self.savepoints[idx].1.clone();
        self.savepoints.truncate(idx + 1);
        Ok(())
    }

    /// Number of established savepoints.
    pub fn savepoint_depth(&self) -> usize {
        self.savepoints.len()
    }

    /// Publish the working copy as the new committed snapshot.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        let mut committed = self.db.inner.committed.write();
        if committed.version != self.base_version {
            return Err(DbError::Conflict {
                expected: self.base_version,
                found: committed.version,
            });
        }
        let tables = std::mem::take(&mut self.working);
        if let Some(store) = &self.db.inner.store {
            store.save(&tables)?;
        }
        committed.tables = tables;
        committed.version += 1;
        Ok(())
    }

    /// Discard the working copy.
    pub fn rollback(mut self) {
        self.finished = true;
    }
}

impl Drop for DbTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!("[hc-02] transaction dropped without commit, rolled back");
        }
    }
}
