//! Durable storage for the task snapshot.
//!
//! Defines the [`SnapshotStore`] trait for saving and loading the opaque
//! serialized task sequence, plus two backends:
//! - [`FileSnapshotStore`]: a JSON file, replaced atomically on every save
//! - [`InMemorySnapshotStore`]: in-memory blob for tests, can simulate failures

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use taskminder_model::codec::CodecError;

/// Errors that can occur while saving or loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The backing file could not be read or written.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The task collection could not be encoded.
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] CodecError),
    /// The stored snapshot is not a well-formed task sequence.
    #[error("snapshot decode failed: {0}")]
    Decode(#[source] CodecError),
    /// The backend refused the write.
    #[error("snapshot storage unavailable: {0}")]
    Unavailable(String),
}

/// Opaque blob storage for the task snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the snapshot could not be stored.
    fn save(&self, snapshot: &str) -> Result<(), PersistenceError>;

    /// Returns the stored snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the storage exists but cannot be read.
    fn load(&self) -> Result<Option<String>, PersistenceError>;
}

/// Stores the snapshot in a single JSON file.
///
/// Saves write a sibling temporary file and rename it over the target, so
/// a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let temp = self.temp_path();
        std::fs::write(&temp, snapshot).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))
    }

    fn load(&self) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory snapshot storage for testing.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshot: Mutex<Option<String>>,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot.into())),
            ..Self::default()
        }
    }

    /// Makes every subsequent save and load fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the last successfully saved snapshot.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.snapshot.lock().clone()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: &str) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("simulated write failure".into()));
        }
        *self.snapshot.lock() = Some(snapshot.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("simulated read failure".into()));
        }
        Ok(self.snapshot.lock().clone())
    }
}
