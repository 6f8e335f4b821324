//! Persistence for the challenge nonce between sessions.
//!
//! The nonce from the last `success` lets the next login send a full auth
//! blob straight away instead of waiting for a fresh challenge.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;

/// Storage for the most recent challenge nonce.
pub trait ChallengeStore: Send {
    /// Stored nonce, or `None` if nothing was saved.
    fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored nonce.
    fn save(&mut self, nonce: &[u8]) -> Result<()>;
}

/// Nonce kept in a single file.
#[derive(Debug, Clone)]
pub struct FileChallengeStore {
    path: PathBuf,
}

impl FileChallengeStore {
    /// Store at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChallengeStore for FileChallengeStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, nonce: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, nonce)?;
        tracing::debug!("Challenge nonce saved to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryChallengeStore {
    nonce: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryChallengeStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with a nonce.
    pub fn with_nonce(nonce: impl Into<Vec<u8>>) -> Self {
        Self {
            nonce: Arc::new(Mutex::new(Some(nonce.into()))),
        }
    }

    /// Current contents.
    pub fn get(&self) -> Option<Vec<u8>> {
        self.nonce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChallengeStore for MemoryChallengeStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.get())
    }

    fn save(&mut self, nonce: &[u8]) -> Result<()> {
        *self.nonce.lock().unwrap_or_else(PoisonError::into_inner) = Some(nonce.to_vec());
        Ok(())
    }
}
