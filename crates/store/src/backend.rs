use crate::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value backend for one logical table.
pub trait KvBackend: Send + Sync {
    /// Insert or update a key-value pair.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Retrieve a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Delete a key. Returns whether the key was present.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
    /// Insert or update multiple key-value pairs atomically.
    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;
    /// Visit every entry in key order.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Selects the storage backend.
///
/// # Example
/// ```
/// use store::BackendConfig;
///
/// let config = BackendConfig::in_memory();
/// let config = BackendConfig::redb("/data/securevote.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// A single redb database file holding every table.
    Redb { path: String },
    /// Process-local maps. Nothing survives a restart.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Open the storage described by this configuration.
    pub fn open(&self) -> Result<Storage, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Storage {
                inner: StorageInner::InMemory,
            }),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    let db = self::redb::open_database(path)?;
                    tracing::info!(path = %path, "opened redb storage");
                    Ok(Storage {
                        inner: StorageInner::Redb(db),
                    })
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

enum StorageInner {
    InMemory,
    #[cfg(feature = "backend-redb")]
    Redb(std::sync::Arc<::redb::Database>),
}

/// Open storage handle. Hands out one backend per logical table.
pub struct Storage {
    inner: StorageInner,
}

impl Storage {
    /// Backend for the named table.
    ///
    /// For in-memory storage every call returns a fresh, empty table, so
    /// callers should ask once and keep the handle.
    pub fn table(&self, name: &'static str) -> Result<Box<dyn KvBackend>, StoreError> {
        match &self.inner {
            StorageInner::InMemory => Ok(Box::new(InMemoryBackend::new())),
            #[cfg(feature = "backend-redb")]
            StorageInner::Redb(db) => Ok(Box::new(RedbBackend::open_table(db.clone(), name)?)),
        }
    }

    pub fn is_durable(&self) -> bool {
        !matches!(self.inner, StorageInner::InMemory)
    }
}

/// An in-memory backend using a `RwLock` around a `HashMap`.
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .remove(key)
            .is_some())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        // One write lock for the whole batch.
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for (key, value) in entries {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let mut keys: Vec<&String> = guard.keys().collect();
        keys.sort();
        for key in keys {
            visitor(key, &guard[key])?;
        }
        Ok(())
    }
}

/// Redb backend, one table of a shared database file.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
