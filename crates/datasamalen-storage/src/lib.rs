//! Datasamalen storage crate.
//!
//! Observation stores for the bearing pipeline.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `redb` | ✅ | Persistent storage using redb |
//! | `memory` | ✅ | In-memory storage for testing |
//!
//! ## Example
//!
//! ```rust,no_run
//! use datasamalen_core::{ingest, query_bearing, SensorReader};
//! use datasamalen_storage::RedbObservationStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedbObservationStore::open("./data/datasamalen.redb")?;
//! let mut sensor = SensorReader::disabled();
//! let now = chrono::Utc::now();
//! ingest("C 2013-06-01 12:00:01 ...", &mut sensor, &store, now)?;
//! let estimate = query_bearing(&store, "00:11:22:33:44:55", chrono::Duration::seconds(10), now)?;
//! println!("{:?}", estimate);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod error;

pub use error::{Error, Result};

pub use backends::{available_backends, create_store};

#[cfg(feature = "redb")]
pub use backends::{RedbObservationStore, RedbStoreConfig};

#[cfg(feature = "memory")]
pub use backends::MemoryObservationStore;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
