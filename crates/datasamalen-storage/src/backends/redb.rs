//! Redb observation store.
//!
//! Provides persistent storage using the redb embedded database.

use std::ops::Bound;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use datasamalen_core::storage::{ObservationStore, Result as StoreResult};
use datasamalen_core::{LogEntry, RegistryEntry};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

// Observation log: key = (device_id, timestamp nanos, sequence), value = LogEntry (JSON)
const LOG_TABLE: TableDefinition<(&str, i64, u64), &[u8]> =
    TableDefinition::new("client_observations");

// Log bookkeeping: key = name, value = counter
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("log_meta");

const NEXT_SEQ: &str = "next_seq";

// Device registry: key = device_id, value = RegistryEntry (JSON)
const REGISTRY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("clients");

/// Configuration for [`RedbObservationStore`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedbStoreConfig {
    /// Path to the database file.
    pub path: String,

    /// Create parent directories if they don't exist.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,
}

fn default_create_dirs() -> bool {
    true
}

impl RedbStoreConfig {
    /// Create a new config with the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
        }
    }

    /// Set whether to create parent directories.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    /// Config for a throwaway database.
    pub fn memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            create_dirs: false,
        }
    }
}

/// Observation log and device registry in one redb file.
pub struct RedbObservationStore {
    db: Database,
    /// Storage path (":memory:" for a temporary database).
    path: String,
    /// Backing file of a temporary database, removed on drop.
    temp_path: Option<PathBuf>,
}

impl RedbObservationStore {
    /// Open or create a store with the given configuration.
    pub fn new(config: RedbStoreConfig) -> Result<Self> {
        let (db, temp_path) = if config.path == ":memory:" {
            // redb has no in-memory mode here; use a uniquely named temp file.
            let temp_path =
                std::env::temp_dir().join(format!("datasamalen_{}.redb", uuid::Uuid::new_v4()));
            (Database::create(&temp_path)?, Some(temp_path))
        } else {
            let path_ref = Path::new(&config.path);
            if config.create_dirs {
                if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let db = if path_ref.exists() {
                Database::open(path_ref)?
            } else {
                Database::create(path_ref)?
            };
            (db, None)
        };

        // Make sure both tables exist so read transactions can open them.
        let write_txn = db.begin_write()?;
        {
            let _log = write_txn.open_table(LOG_TABLE)?;
            let _meta = write_txn.open_table(META_TABLE)?;
            let _registry = write_txn.open_table(REGISTRY_TABLE)?;
        }
        write_txn.commit()?;

        info!(category = "storage", path = %config.path, "Opened observation store");
        Ok(Self {
            db,
            path: config.path,
            temp_path,
        })
    }

    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(RedbStoreConfig::new(
            path.as_ref().to_string_lossy().to_string(),
        ))
    }

    /// Create a store on a temporary file (for testing).
    pub fn memory() -> Result<Self> {
        Self::new(RedbStoreConfig::memory())
    }

    /// Get the storage path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_persistent(&self) -> bool {
        self.temp_path.is_none()
    }

    // ========== Observation Log ==========

    /// Append a log entry. Entries sharing a timestamp keep insertion order.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let nanos = timestamp_key(entry.timestamp)?;
        let json = serde_json::to_vec(entry)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META_TABLE)?;
            let seq = meta.get(NEXT_SEQ)?.map(|v| v.value()).unwrap_or(0);
            meta.insert(NEXT_SEQ, seq + 1)?;

            let mut table = write_txn.open_table(LOG_TABLE)?;
            table.insert((entry.device_id.as_str(), nanos, seq), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Entries of `device_id` strictly after `after`, oldest first.
    pub fn entries_after(&self, device_id: &str, after: DateTime<Utc>) -> Result<Vec<LogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOG_TABLE)?;

        // The highest sequence at `after` itself, so the bound excludes that instant.
        let start = (device_id, timestamp_key(after)?, u64::MAX);

        let mut entries = Vec::new();
        for result in table.range((Bound::Excluded(start), Bound::Unbounded))? {
            let (key, value) = result?;
            if key.value().0 != device_id {
                break;
            }
            entries.push(serde_json::from_slice(value.value())?);
        }

        Ok(entries)
    }

    /// Drop every log entry. Returns how many were removed.
    pub fn clear_log(&self) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let table = write_txn.open_table(LOG_TABLE)?;
            table.iter()?.count()
        };
        write_txn.delete_table(LOG_TABLE)?;
        {
            let _log = write_txn.open_table(LOG_TABLE)?;
        }
        write_txn.commit()?;

        debug!(category = "storage", removed, "Cleared observation log");
        Ok(removed)
    }

    /// Number of log entries.
    pub fn log_len(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOG_TABLE)?;
        Ok(table.iter()?.count())
    }

    // ========== Device Registry ==========

    /// Load a registry entry.
    pub fn load_device(&self, device_id: &str) -> Result<Option<RegistryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REGISTRY_TABLE)?;

        match table.get(device_id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    /// Save a registry entry. With `must_exist` the device must already be
    /// registered, otherwise it must not be.
    fn save_device(&self, entry: &RegistryEntry, must_exist: bool) -> Result<()> {
        let json = serde_json::to_string(entry)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REGISTRY_TABLE)?;
            let exists = table.get(entry.device_id.as_str())?.is_some();
            match (exists, must_exist) {
                (false, true) => return Err(Error::NotFound(entry.device_id.clone())),
                (true, false) => return Err(Error::Conflict(entry.device_id.clone())),
                _ => {}
            }
            table.insert(entry.device_id.as_str(), json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List all registry entries, ordered by device id.
    pub fn list_devices(&self) -> Result<Vec<RegistryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REGISTRY_TABLE)?;

        let mut devices = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            devices.push(serde_json::from_str(value.value())?);
        }

        Ok(devices)
    }
}

fn timestamp_key(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| Error::Storage(format!("Timestamp {} out of range", at)))
}

impl ObservationStore for RedbObservationStore {
    fn insert_log_entry(&self, entry: &LogEntry) -> StoreResult<()> {
        Ok(self.append(entry)?)
    }

    fn find_registry_entry(&self, device_id: &str) -> StoreResult<Option<RegistryEntry>> {
        Ok(self.load_device(device_id)?)
    }

    fn insert_registry_entry(&self, entry: &RegistryEntry) -> StoreResult<()> {
        Ok(self.save_device(entry, false)?)
    }

    fn update_registry_entry(&self, entry: &RegistryEntry) -> StoreResult<()> {
        Ok(self.save_device(entry, true)?)
    }

    fn find_log_entries(&self, device_id: &str, after: DateTime<Utc>) -> StoreResult<Vec<LogEntry>> {
        Ok(self.entries_after(device_id, after)?)
    }

    fn delete_all_log_entries(&self) -> StoreResult<usize> {
        Ok(self.clear_log()?)
    }

    fn list_registry_entries(&self) -> StoreResult<Vec<RegistryEntry>> {
        Ok(self.list_devices()?)
    }

    fn log_entry_count(&self) -> StoreResult<usize> {
        Ok(self.log_len()?)
    }
}

/// Cleanup temporary database file when the store is dropped.
impl Drop for RedbObservationStore {
    fn drop(&mut self) {
        if let Some(temp_path) = &self.temp_path {
            if let Err(e) = std::fs::remove_file(temp_path) {
                debug!(
                    "Failed to remove temporary database file {}: {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}
