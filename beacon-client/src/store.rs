//! Persistent cache slot
//!
//! A store holds exactly one blob: the last encoded snapshot of the pending
//! queue. Saving replaces the whole blob.
//!
//! # Example
//!
//! ```rust
//! use beacon_client::store::{MemoryStore, PersistentStore};
//!
//! let store = MemoryStore::new();
//! assert!(store.load().unwrap().is_none());
//!
//! store.save(br#"{"events":[]}"#).unwrap();
//! assert!(store.load().unwrap().is_some());
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};

/// Default name of the cache slot
pub const DEFAULT_CACHE_NAME: &str = "analytics_cache";

/// Storage for the single cache slot
///
/// Implementations only report errors; deciding that they are non-fatal is
/// up to the caller.
pub trait PersistentStore: Send + Sync {
    /// Replace the slot content
    fn save(&self, bytes: &[u8]) -> StoreResult<()>;

    /// Read the slot, `None` if it was never written
    fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Get backend name (for logging)
    fn name(&self) -> &'static str;
}

/// Platform "commit to disk" call made after every successful write
///
/// Needed where the filesystem is virtualised over real storage and writes
/// are not durable until explicitly synced.
pub trait DurabilityHook: Send + Sync {
    /// Make the just-written slot durable
    fn commit(&self, path: &Path) -> StoreResult<()>;
}

/// Hook for platforms where a completed write is already durable
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDurabilityHook;

impl DurabilityHook for NoopDurabilityHook {
    fn commit(&self, _path: &Path) -> StoreResult<()> {
        Ok(())
    }
}

/// File-backed cache slot
///
/// Saves go to a sibling temp file which is synced and then renamed over the
/// slot, so a reader sees either the old or the new content. On unix the
/// containing directory is synced after the rename as well.
pub struct FileStore {
    path: PathBuf,
    hook: Arc<dyn DurabilityHook>,
}

impl FileStore {
    /// Slot `name` inside `directory`
    pub fn new<P: Into<PathBuf>>(directory: P, name: &str) -> Self {
        Self {
            path: directory.into().join(name),
            hook: Arc::new(NoopDurabilityHook),
        }
    }

    /// Slot with the default name inside `directory`
    pub fn in_dir<P: Into<PathBuf>>(directory: P) -> Self {
        Self::new(directory, DEFAULT_CACHE_NAME)
    }

    /// Set the durability hook called after every write
    pub fn with_durability_hook(mut self, hook: Arc<dyn DurabilityHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Full path of the slot
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Persist the rename itself by syncing the directory entry
    #[cfg(unix)]
    fn sync_parent(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::File::open(dir)?.sync_all(),
            _ => Ok(()),
        }
    }

    // Directories cannot be opened as files here; the rename is left to the OS
    #[cfg(not(unix))]
    fn sync_parent(&self) -> std::io::Result<()> {
        Ok(())
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

impl PersistentStore for FileStore {
    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.write_err(e))?;
        }

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp).map_err(|e| self.write_err(e))?;
            file.write_all(bytes).map_err(|e| self.write_err(e))?;
            file.sync_all().map_err(|e| self.write_err(e))?;
        }

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(self.write_err(e));
        }
        self.sync_parent().map_err(|e| self.write_err(e))?;

        self.hook.commit(&self.path)
    }

    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory cache slot
///
/// Content is lost with the process. Useful for tests and for hosts that
/// have no writable filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot that already holds `bytes`
    pub fn with_content(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: RwLock::new(Some(bytes.into())),
        }
    }
}

impl PersistentStore for MemoryStore {
    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        *self.slot.write() = Some(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.slot.read().clone())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
