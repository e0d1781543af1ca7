//! # File Snapshot Store
//!
//! Persists the committed snapshot as one bincode file, written through a
//! temp file and an atomic rename.

use crate::domain::tables::Tables;
use crate::error::{DbError, Result};
use crate::ports::outbound::SnapshotStore;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Snapshot file under the node data directory.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// File name inside the data directory.
    pub const FILE_NAME: &'static str = "state.bin";

    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_err(e: impl std::fmt::Display) -> DbError {
    DbError::Persistence(e.to_string())
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Tables>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("[hc-02] 📁 No existing snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(io_err(e)),
        };
        tracing::info!(
            "[hc-02] 💾 Found existing snapshot: {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );
        bincode::deserialize(&bytes).map(Some).map_err(io_err)
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = bincode::serialize(tables).map_err(io_err)?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}
