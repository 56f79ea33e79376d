//! Durable session state.
//!
//! The whole `{cookies, state}` tuple is written on every state-affecting
//! event and read once at session construction. Nothing guards a store
//! file against a second process using it at the same time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::ProtocolState;
use crate::error::{EppError, Result};
use crate::transport::CookieSet;

/// What survives a process restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Session cookies
    pub cookies: CookieSet,
    /// Protocol state
    pub state: ProtocolState,
}

/// Persistence backend for [`StoredSession`].
pub trait SessionStore: Send {
    /// Read the stored session; `None` when nothing was ever saved.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session.
    fn save(&mut self, session: &StoredSession) -> Result<()>;
}

/// JSON file store, overwritten wholesale.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `path`; the file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the store path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, reason: impl ToString) -> EppError {
        EppError::Store {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_error(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| self.store_error(e))
    }

    fn save(&mut self, session: &StoredSession) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.store_error(e))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| self.store_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.store_error(e))?;
        tracing::trace!(path = %self.path.display(), state = %session.state, "Session stored");
        Ok(())
    }
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<StoredSession>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding `session`.
    pub fn with(session: StoredSession) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Option<StoredSession> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, session: &StoredSession) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tag.session.json");
        let mut store = FileStore::new(&path);

        let first = StoredSession {
            cookies: CookieSet::from_set_cookie(["sid=1"]),
            state: ProtocolState::LoggedIn,
        };
        store.save(&first).unwrap();
        let second = StoredSession::default();
        store.save(&second).unwrap();

        assert_eq!(FileStore::new(&path).load().unwrap(), Some(second));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, EppError::Store { path: p, .. } if p == path));
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer
            .save(&StoredSession {
                cookies: CookieSet::new(),
                state: ProtocolState::Helloed,
            })
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap().state, ProtocolState::Helloed);
    }
}
