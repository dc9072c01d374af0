//! Key-value persistence for timer state
//!
//! The engine only needs `get`/`set`/`delete` over a handful of string keys,
//! the same contract a browser's local storage offers. `FileStore` keeps the
//! map in a JSON file so the countdown survives restarts; `MemoryStore` is
//! the in-process variant used by tests.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

/// Narrow persistence port injected into the timer engine
pub trait KeyValueStore: Send {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value durably
    fn set(&mut self, key: &str, value: &str) -> Result<(), String>;

    /// Remove a key; removing an absent key is not an error
    fn delete(&mut self, key: &str) -> Result<(), String>;

    /// Pick up writes made by other holders of the same storage.
    /// Stores without an external backing have nothing to do.
    fn refresh(&mut self) {}
}

/// In-memory store. Clones share the same entries, which lets tests model
/// a page reload (or a second tab) as a new engine over the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self.entries.lock()
            .map_err(|e| format!("Failed to lock memory store: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), String> {
        let mut entries = self.entries.lock()
            .map_err(|e| format!("Failed to lock memory store: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file store holding a flat string map.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable
    /// or corrupt file is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!("Opened timer store at {} with {} keys", path.display(), entries.len());
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| format!("Failed to serialize timer store: {}", e))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| format!("Failed to write {}: {}", tmp_path.display(), e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| format!("Failed to replace {}: {}", self.path.display(), e))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn delete(&mut self, key: &str) -> Result<(), String> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn refresh(&mut self) {
        self.entries = load_entries(&self.path);
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read timer store {}: {}, starting empty", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Timer store {} is corrupt: {}, starting empty", path.display(), e);
            BTreeMap::new()
        }
    }
}
