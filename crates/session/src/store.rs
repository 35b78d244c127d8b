//! Persisted session hint.
//!
//! Exactly two scalar fields survive a process restart: the last
//! authenticated address and chain id. They are a restore hint only, never
//! an authority; the machine re-validates them against the live wallet.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use gavel_types::Address;

/// The persisted restore hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub address: Address,
    pub chain_id: u64,
}

/// Storage for the restore hint.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<PersistedSession>;
    fn save(&self, hint: &PersistedSession);
    fn clear(&self);
}

/// In-memory store, used in tests and as a no-persistence default.
#[derive(Default)]
pub struct MemorySessionStore {
    hint: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<PersistedSession> {
        *self.hint.lock()
    }

    fn save(&self, hint: &PersistedSession) {
        *self.hint.lock() = Some(*hint);
    }

    fn clear(&self) {
        *self.hint.lock() = None;
    }
}

/// JSON-file-backed store. A missing or unreadable file is an absent hint,
/// never an error.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<PersistedSession> {
        let bytes = std::fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&self, hint: &PersistedSession) {
        let json = match serde_json::to_vec_pretty(hint) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to encode session hint");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, json) {
            warn!(%err, path = %self.path.display(), "failed to persist session hint");
        }
    }

    fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(%err, path = %self.path.display(), "failed to clear session hint");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint() -> PersistedSession {
        PersistedSession {
            address: Address([7u8; 20]),
            chain_id: 50312,
        }
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load(), None);

        store.save(&hint());
        assert_eq!(store.load(), Some(hint()));

        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        assert_eq!(store.load(), None);
        store.save(&hint());
        assert_eq!(store.load(), Some(hint()));

        store.clear();
        assert_eq!(store.load(), None);
        // Clearing twice is fine.
        store.clear();
    }

    #[test]
    fn test_file_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileSessionStore::new(path);
        assert_eq!(store.load(), None);
    }
}
