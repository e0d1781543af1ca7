//! Node key directory.
//!
//! The directory holds one hex-encoded `PrivateKey` file. The public key and
//! the key id are derived on load, never stored.

use crate::error::KeyError;
use shared_crypto::{key_id_from_public, Ed25519KeyPair};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PRIVATE_KEY_FILE: &str = "PrivateKey";

pub struct NodeKeys {
    key: Ed25519KeyPair,
    path: PathBuf,
}

impl NodeKeys {
    pub fn load(dir: &Path) -> Result<Self, KeyError> {
        let path = dir.join(PRIVATE_KEY_FILE);
        let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => KeyError::NotFound(path.clone()),
            _ => KeyError::Io {
                path: path.clone(),
                source,
            },
        })?;
        let key = Ed25519KeyPair::from_hex(text.trim())?;
        Ok(Self { key, path })
    }

    /// Create a fresh key in `dir`. An existing key is never replaced.
    pub fn generate(dir: &Path) -> Result<Self, KeyError> {
        let path = dir.join(PRIVATE_KEY_FILE);
        if path.exists() {
            return Err(KeyError::AlreadyExists(path));
        }
        let io = |source| KeyError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(io)?;
        let key = Ed25519KeyPair::generate();
        write_private(&path, &key.to_hex()).map_err(io)?;
        let keys = Self { key, path };
        info!(key_id = keys.key_id(), path = %keys.path.display(), "[node] 🔑 node key generated");
        Ok(keys)
    }

    pub fn key_pair(&self) -> &Ed25519KeyPair {
        &self.key
    }

    pub fn into_key_pair(self) -> Ed25519KeyPair {
        self.key
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.key.public_key().as_bytes().to_vec()
    }

    pub fn key_id(&self) -> i64 {
        key_id_from_public(self.key.public_key().as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn write_private(path: &Path, text: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(text.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, text: &str) -> std::io::Result<()> {
    fs::write(path, text)
}
