//! Store collaborator abstraction.
//!
//! The pipeline never talks to a database directly. It issues one logical
//! operation per capture line against an [`ObservationStore`], which owns an
//! append-only observation log and a device registry keyed by device id.

use chrono::{DateTime, Utc};

use crate::record::{LogEntry, RegistryEntry};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types.
///
/// Opaque to the pipeline: whatever the backend reports is propagated as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The registry entry to update does not exist.
    #[error("Registry entry not found: {0}")]
    NotFound(String),

    /// A registry entry with this id already exists.
    #[error("Registry entry already exists: {0}")]
    Conflict(String),

    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Other error.
    #[error("Storage error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Append-only observation log plus an upsertable device registry.
///
/// Implementations must make each call atomic on its own; the pipeline does
/// not group calls into transactions.
pub trait ObservationStore: Send + Sync {
    /// Append one entry to the observation log.
    fn insert_log_entry(&self, entry: &LogEntry) -> Result<()>;

    /// Look up the registry entry for a device.
    fn find_registry_entry(&self, device_id: &str) -> Result<Option<RegistryEntry>>;

    /// Add a registry entry for a device that has none yet.
    fn insert_registry_entry(&self, entry: &RegistryEntry) -> Result<()>;

    /// Replace the registry entry of an already registered device.
    fn update_registry_entry(&self, entry: &RegistryEntry) -> Result<()>;

    /// All log entries of `device_id` strictly newer than `after`, oldest first.
    fn find_log_entries(&self, device_id: &str, after: DateTime<Utc>) -> Result<Vec<LogEntry>>;

    /// Remove every log entry. Returns the number removed.
    fn delete_all_log_entries(&self) -> Result<usize>;

    /// All registry entries, ordered by device id.
    fn list_registry_entries(&self) -> Result<Vec<RegistryEntry>>;

    /// Number of entries currently in the log.
    fn log_entry_count(&self) -> Result<usize>;
}
