//! Local persistent key-value storage
//!
//! Holds the handful of values the client keeps across runs: session tokens,
//! the tenant override, the device identifier and the UI theme preference.
//! [`MemoryStore`] is the default; [`FileStore`] persists a flat JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Access token key
pub const ACCESS_TOKEN_KEY: &str = "access";
/// Refresh token key
pub const REFRESH_TOKEN_KEY: &str = "refresh";
/// Tenant code override key
pub const TENANT_CODE_KEY: &str = "tenant_code";
/// Device identifier key
pub const DEVICE_ID_KEY: &str = "device_id";
/// UI theme key
pub const THEME_KEY: &str = "theme";

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing file could not be read or written
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON object of strings
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Lock poisoned by a panicking writer
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle passed to every service
pub type SharedStore = Arc<dyn KeyValueStore>;

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared empty store
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

/// JSON-file backed store
///
/// The whole map is rewritten on every change through a temp file and rename,
/// so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(values).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::Poisoned)?;
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().map_err(|_| StorageError::Poisoned)?;
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}

/// Open the store described by the storage config
pub fn open_store(path: Option<&Path>) -> Result<SharedStore, StorageError> {
    match path {
        Some(path) => Ok(Arc::new(FileStore::open(path)?)),
        None => Ok(MemoryStore::shared()),
    }
}

/// Read a value, treating blank strings as absent
pub fn get_non_empty(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    store
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Access/refresh token helpers
pub struct SessionTokens;

impl SessionTokens {
    /// Stored access token, if any
    pub fn access(store: &dyn KeyValueStore) -> Option<String> {
        get_non_empty(store, ACCESS_TOKEN_KEY)
    }

    /// Stored refresh token, if any
    pub fn refresh(store: &dyn KeyValueStore) -> Option<String> {
        get_non_empty(store, REFRESH_TOKEN_KEY)
    }

    /// Persist a freshly issued token pair
    pub fn store(
        store: &dyn KeyValueStore,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<(), StorageError> {
        store.set(ACCESS_TOKEN_KEY, access)?;
        if let Some(refresh) = refresh {
            store.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    /// Remove both tokens. Failures are logged, never returned.
    pub fn clear(store: &dyn KeyValueStore) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear session token");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("access").is_none());
        store.set("access", "abc").unwrap();
        assert_eq!(store.get("access").as_deref(), Some("abc"));
        store.remove("access").unwrap();
        store.remove("access").unwrap();
        assert!(store.get("access").is_none());
    }

    #[test]
    fn test_file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set(DEVICE_ID_KEY, "dev-1").unwrap();
            store.set(THEME_KEY, "dark").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(DEVICE_ID_KEY).as_deref(), Some("dev-1"));
        assert_eq!(reopened.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        let store = FileStore::open(blocker.join("session.json")).unwrap();

        // a plain file where the parent directory should go
        std::fs::write(&blocker, "").unwrap();

        assert!(matches!(store.set(THEME_KEY, "dark"), Err(StorageError::Io { .. })));
        assert!(store.get(THEME_KEY).is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_session_tokens_clear() {
        let store = MemoryStore::new();
        SessionTokens::store(&store, "a", Some("r")).unwrap();
        store.set(DEVICE_ID_KEY, "keep-me").unwrap();

        SessionTokens::clear(&store);

        assert!(SessionTokens::access(&store).is_none());
        assert!(SessionTokens::refresh(&store).is_none());
        assert_eq!(store.get(DEVICE_ID_KEY).as_deref(), Some("keep-me"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "   ").unwrap();
        assert!(SessionTokens::access(&store).is_none());
    }
}
