//! Redb backend for SecureVote storage.
//!
//! One database file holds every logical table. Commits use redb's default
//! immediate durability, so a returned `Ok` has reached disk.

use crate::{KvBackend, StoreError};
use ::redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

pub(crate) fn open_database<P: AsRef<Path>>(path: P) -> Result<Arc<Database>, StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
    }
    let db = Database::create(path).map_err(StoreError::backend)?;
    Ok(Arc::new(db))
}

/// A single redb table addressed by name.
///
/// The `Arc<Database>` is shared with every other table handed out by the
/// same [`crate::Storage`]; redb serializes write transactions internally.
pub struct RedbBackend {
    db: Arc<Database>,
    table: &'static str,
}

impl RedbBackend {
    /// Open a standalone database file with a single table.
    ///
    /// ```no_run
    /// use store::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/votes.redb", "vote_records").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, table: &'static str) -> Result<Self, StoreError> {
        Self::open_table(open_database(path)?, table)
    }

    pub(crate) fn open_table(db: Arc<Database>, table: &'static str) -> Result<Self, StoreError> {
        let backend = Self { db, table };
        // Accessing the table inside a write transaction creates it.
        let write_txn = backend.db.begin_write().map_err(StoreError::backend)?;
        {
            let _table = write_txn
                .open_table(backend.definition())
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(backend)
    }

    fn definition(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.table)
    }
}

impl KvBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(StoreError::backend)?;
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(self.definition())
            .map_err(StoreError::backend)?;
        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        let existed = {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(StoreError::backend)?;
            let removed = table.remove(key).map_err(StoreError::backend)?;
            removed.is_some()
        };
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(existed)
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(StoreError::backend)?;
            for (key, value) in entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(self.definition())
            .map_err(StoreError::backend)?;

        for item in table.iter().map_err(StoreError::backend)? {
            let (key, value) = item.map_err(StoreError::backend)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}
