//! # Persistence Backends
//!
//! A backend maps storage keys (collection names, plus `scalars`) to
//! opaque byte blobs. It never sees partial collections: each write hands
//! over complete replacement values for one or more keys, and a backend
//! must make either all of them or none of them visible.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Key-to-blob persistence used by [`crate::EntityStore`].
pub trait Backend: Send + Sync + fmt::Debug {
    /// Load the blob stored under `key`, or `None` if it was never written.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the blobs of every listed key.
    fn persist(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError>;
}

/// Process-local backend. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn persist(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write();
        for (key, bytes) in entries {
            blobs.insert(key.clone(), bytes.clone());
        }
        Ok(())
    }
}

/// Name of the commit journal inside the data directory. It can never
/// collide with a key file, which always ends in `.json`.
const JOURNAL: &str = "commit.journal";

/// One journaled key and its complete new value.
#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    key: String,
    bytes: Vec<u8>,
}

/// Directory-backed persistence: `<root>/<key>.json` per key.
///
/// A commit touching several keys is first written, in full, to a journal
/// file that is renamed into place in one step. That rename is the commit
/// point. The journaled values are then copied into their key files and
/// the journal removed. Until that has succeeded, reads of a journaled key
/// return the journaled value, and opening the directory replays the
/// journal. Single-key commits skip the journal: one rename is already
/// all-or-nothing.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a data directory, replaying any journal
    /// left by an interrupted commit.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        let backend = Self { root };
        backend.replay()?;
        Ok(backend)
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL)
    }

    fn read_journal(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let path = self.journal_path();
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                key: JOURNAL.to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Write `bytes` to a temporary file in `root`, sync it, rename it to `path`.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Copy journaled values into their key files, then drop the journal.
    fn apply(&self, entries: &[JournalEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.write_file(&self.path_for(&entry.key)?, &entry.bytes)?;
        }
        let path = self.journal_path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn replay(&self) -> Result<(), StoreError> {
        let entries = self.read_journal()?;
        if entries.is_empty() {
            return Ok(());
        }
        match self.apply(&entries) {
            Ok(()) => tracing::debug!(keys = entries.len(), "journal replayed"),
            Err(e) => tracing::warn!(error = %e, "journal replay incomplete, journal kept"),
        }
        Ok(())
    }
}

impl Backend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        if let Some(entry) = self.read_journal()?.into_iter().find(|e| e.key == key) {
            return Ok(Some(entry.bytes));
        }
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn persist(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        for (key, _) in entries {
            self.path_for(key)?;
        }
        let mut pending = self.read_journal()?;
        if pending.is_empty() {
            match entries {
                [] => return Ok(()),
                [(key, bytes)] => {
                    self.write_file(&self.path_for(key)?, bytes)?;
                    tracing::trace!(root = %self.root.display(), keys = 1, "persisted");
                    return Ok(());
                }
                _ => {}
            }
        }

        // Values still waiting in an earlier journal are carried forward.
        for (key, bytes) in entries {
            pending.retain(|e| &e.key != key);
            pending.push(JournalEntry {
                key: key.clone(),
                bytes: bytes.clone(),
            });
        }
        let journal = serde_json::to_vec(&pending).map_err(|source| StoreError::Encode {
            key: JOURNAL.to_string(),
            source,
        })?;
        self.write_file(&self.journal_path(), &journal)?;

        if let Err(e) = self.apply(&pending) {
            tracing::warn!(error = %e, "commit journaled but not yet copied to key files");
        }
        tracing::trace!(root = %self.root.display(), keys = entries.len(), "persisted");
        Ok(())
    }
}
