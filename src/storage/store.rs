use chrono::Utc;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors from the persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Keys become file names, so they are restricted to `[A-Za-z0-9_-]`.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The store refused the write (quota exceeded, read-only medium, ...).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The stored bytes are not text; the document is corrupt, not missing.
    #[error("Stored document for {0:?} is not valid UTF-8")]
    NotText(String),
}

/// Durable string key/value surface.
///
/// Reads and writes are synchronous and expected to be fast; callers never
/// suspend on them. Values are whole documents: there is no partial update and
/// no transaction primitive.
pub trait PersistenceStore: Send {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Store that keeps each key in `<dir>/<key>.json`.
///
/// Writes go through a uniquely named temp file followed by a rename, so a
/// crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Copy the current document for `key` aside as
    /// `<key>.json.corrupt.<timestamp>` before it gets overwritten.
    ///
    /// Returns `Ok(None)` when there is nothing to back up.
    pub fn backup(&self, key: &str) -> Result<Option<PathBuf>, StoreError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let backup_name = format!(
            "{}.json.corrupt.{}",
            key,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let backup_path = self.dir.join(backup_name);
        std::fs::copy(&path, &backup_path)?;
        tracing::info!(from = %path.display(), to = %backup_path.display(), "Backed up stored document");
        Ok(Some(backup_path))
    }
}

impl PersistenceStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StoreError::NotText(key.to_string()))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        // Unpredictable temp name plus create_new avoids clobbering or
        // following a pre-existing file at the temp path.
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("tmp.{:016x}", suffix));

        let result = (|| -> Result<(), std::io::Error> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            drop(file);

            // Rename does not replace an existing file on Windows.
            #[cfg(windows)]
            if path.exists() {
                std::fs::remove_file(&path)?;
            }

            std::fs::rename(&temp_path, &path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Clones share the same map, which lets a test keep a
/// handle on the contents after moving a clone into a `CurationManager`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one raw document.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.lock().insert(key.to_string(), value.to_string());
        store
    }

    /// Make every following write fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw document currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // The map holds plain strings; a poisoned lock still guards valid data.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PersistenceStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_missing_key_reads_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.read("favorites").unwrap().is_none());
    }

    #[test]
    fn test_file_store_write_then_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("favorites", "[]").unwrap();
        assert_eq!(store.read("favorites").unwrap().as_deref(), Some("[]"));

        store.write("favorites", "[1]").unwrap();
        assert_eq!(store.read("favorites").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("favorites", "[]").unwrap();
        store.write("favorites", "[]").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["favorites.json".to_string()]);
    }

    #[test]
    fn test_file_store_reports_binary_document_as_not_text() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("favorites.json"), b"[{\"id\":\"\xff\xfe\"}]").unwrap();
        assert!(matches!(
            store.read("favorites"),
            Err(StoreError::NotText(key)) if key == "favorites"
        ));
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.write("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.read(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_file_store_backup_copies_document() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.backup("favorites").unwrap().is_none());

        store.write("favorites", "{not json").unwrap();
        let backup = store.backup("favorites").unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{not json");
    }

    #[test]
    fn test_file_store_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        store.write("k", "v").unwrap();
        assert!(nested.join("k.json").exists());
    }

    #[test]
    fn test_memory_store_clones_share_contents() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.write("favorites", "[]").unwrap();
        assert_eq!(handle.raw("favorites").as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_store_write_failure_injection() {
        let store = MemoryStore::with_entry("favorites", "[]");
        store.set_fail_writes(true);
        assert!(matches!(
            store.write("favorites", "[1]"),
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.raw("favorites").as_deref(), Some("[]"));
    }
}
