//! File-backed cache store for API responses
//!
//! Provides a `CacheStore` that keeps every cached response in a single JSON
//! document, held fully in memory and rewritten to disk after each mutation.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur while loading or persisting the cache store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Cache file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object
    #[error("Cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory store could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide key-value cache mirrored to a JSON file
///
/// Each top-level key is a *field*, the name of one cached operation. A field
/// holds either a bare value or, for per-argument caching, an object keyed by
/// the stringified argument. The whole document is rewritten on every `set`
/// or `set_nested`; writes are not atomic.
#[derive(Debug)]
pub struct CacheStore {
    /// Path of the backing JSON file
    path: PathBuf,
    /// In-memory copy of the whole document
    fields: Mutex<Map<String, Value>>,
}

impl CacheStore {
    /// Opens the store at `path`, loading the backing file if it has content
    ///
    /// A missing or empty file yields an empty store, which is written out
    /// immediately so the file always exists after the first open. A file that
    /// does not parse as a JSON object is a fatal error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if content.trim().is_empty() {
            let store = Self {
                path,
                fields: Mutex::new(Map::new()),
            };
            store.persist(&store.lock())?;
            return Ok(store);
        }

        let fields: Map<String, Value> = serde_json::from_str(&content)
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            fields: Mutex::new(fields),
        })
    }

    /// Returns the path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the entry stored under `field`, if any
    pub fn get(&self, field: &str) -> Option<Value> {
        self.lock().get(field).cloned()
    }

    /// Replaces the entry under `field` and persists the whole store
    ///
    /// The in-memory document is updated before the write. If the write fails
    /// the error is returned but memory keeps the new entry, so later reads in
    /// this process see it while the file does not.
    pub fn set(&self, field: &str, value: Value) -> Result<Value, StoreError> {
        let mut fields = self.lock();
        fields.insert(field.to_string(), value.clone());
        self.persist(&fields)?;
        Ok(value)
    }

    /// Returns the sub-entry `key` of a per-argument field
    ///
    /// Absent when the field is missing, is not an object, or lacks `key`.
    pub fn get_nested(&self, field: &str, key: &str) -> Option<Value> {
        self.lock()
            .get(field)
            .and_then(Value::as_object)
            .and_then(|container| container.get(key))
            .cloned()
    }

    /// Sets `key` inside the per-argument container for `field`
    ///
    /// Creates the container if needed; a non-object entry under `field` is
    /// replaced by a fresh container. Sibling keys are left untouched. As with
    /// `set`, a failed write leaves memory ahead of the file.
    pub fn set_nested(&self, field: &str, key: &str, value: Value) -> Result<Value, StoreError> {
        let mut fields = self.lock();
        let container = fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !container.is_object() {
            *container = Value::Object(Map::new());
        }
        if let Value::Object(map) = container {
            map.insert(key.to_string(), value.clone());
        }
        self.persist(&fields)?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        // A poisoned lock still holds a consistent document: every mutation
        // completes its insert before persisting.
        self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serializes the full document and overwrites the backing file
    fn persist(&self, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string(fields)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
