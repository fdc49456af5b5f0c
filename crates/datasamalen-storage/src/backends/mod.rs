//! Observation store implementations.
//!
//! Each backend implements [`ObservationStore`] and is feature-gated for
//! conditional compilation.

use std::sync::Arc;

use datasamalen_core::storage::ObservationStore;
use serde_json::Value;

use crate::error::{Error, Result};

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redb")]
pub use redb::{RedbObservationStore, RedbStoreConfig};

#[cfg(feature = "memory")]
pub use memory::MemoryObservationStore;

/// Create an observation store by type identifier.
///
/// # Example
/// ```no_run
/// use datasamalen_storage::backends::create_store;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = create_store("redb", &json!({ "path": "./data/datasamalen.redb" }))?;
/// # Ok(())
/// # }
/// ```
pub fn create_store(backend_type: &str, config: &Value) -> Result<Arc<dyn ObservationStore>> {
    match backend_type {
        #[cfg(feature = "redb")]
        "redb" => {
            let cfg: RedbStoreConfig = serde_json::from_value(config.clone())
                .map_err(|e| Error::Configuration(format!("Invalid redb config: {}", e)))?;
            Ok(Arc::new(RedbObservationStore::new(cfg)?))
        }

        #[cfg(feature = "memory")]
        "memory" => Ok(Arc::new(MemoryObservationStore::new())),

        _ => Err(Error::Configuration(format!(
            "Unknown backend type: {}. Available backends: {}",
            backend_type,
            available_backends().join(", ")
        ))),
    }
}

/// Backend types compiled into this build.
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();
    #[cfg(feature = "redb")]
    backends.push("redb");
    #[cfg(feature = "memory")]
    backends.push("memory");
    backends
}
