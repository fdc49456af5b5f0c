//! In-memory observation store.
//!
//! Provides non-persistent storage for testing and development.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use datasamalen_core::storage::{ObservationStore, Result, StoreError};
use datasamalen_core::{LogEntry, RegistryEntry};
use parking_lot::RwLock;

/// Log key: device, timestamp, insertion sequence.
type LogKey = (String, DateTime<Utc>, u64);

#[derive(Default)]
struct Inner {
    log: BTreeMap<LogKey, LogEntry>,
    registry: BTreeMap<String, RegistryEntry>,
    next_seq: u64,
}

/// Observation store kept entirely in memory.
#[derive(Default)]
pub struct MemoryObservationStore {
    inner: RwLock<Inner>,
}

impl MemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObservationStore for MemoryObservationStore {
    fn insert_log_entry(&self, entry: &LogEntry) -> Result<()> {
        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .log
            .insert((entry.device_id.clone(), entry.timestamp, seq), entry.clone());
        Ok(())
    }

    fn find_registry_entry(&self, device_id: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.inner.read().registry.get(device_id).cloned())
    }

    fn insert_registry_entry(&self, entry: &RegistryEntry) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.registry.contains_key(&entry.device_id) {
            return Err(StoreError::Conflict(entry.device_id.clone()));
        }
        inner.registry.insert(entry.device_id.clone(), entry.clone());
        Ok(())
    }

    fn update_registry_entry(&self, entry: &RegistryEntry) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.registry.get_mut(&entry.device_id) {
            Some(existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(entry.device_id.clone())),
        }
    }

    fn find_log_entries(&self, device_id: &str, after: DateTime<Utc>) -> Result<Vec<LogEntry>> {
        let inner = self.inner.read();
        let start: LogKey = (device_id.to_string(), after, u64::MAX);
        Ok(inner
            .log
            .range((Bound::Excluded(start), Bound::Unbounded))
            .take_while(|((id, _, _), _)| id == device_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn delete_all_log_entries(&self) -> Result<usize> {
        let mut inner = self.inner.write();
        let removed = inner.log.len();
        inner.log.clear();
        Ok(removed)
    }

    fn list_registry_entries(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.inner.read().registry.values().cloned().collect())
    }

    fn log_entry_count(&self) -> Result<usize> {
        Ok(self.inner.read().log.len())
    }
}
