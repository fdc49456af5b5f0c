//! Core pipeline for Datasamalen.
//!
//! Turns scrubbed packet-capture lines into typed client observations, tags
//! them with a directional sensor angle, and estimates a device's bearing and
//! peak signal strength from the observations of a trailing time window.
//!
//! Storage is abstracted behind [`storage::ObservationStore`]; concrete stores
//! live in the `datasamalen-storage` crate.

pub mod aggregator;
pub mod bearing;
pub mod config;
pub mod error;
pub mod filter;
pub mod parser;
pub mod record;
pub mod sensor;
pub mod storage;

pub use aggregator::{
    CaptureOptions, CaptureStats, clear_observations, ingest, list_devices, query_bearing,
    run_capture,
};
pub use bearing::{center_of_gravity, temporal_centroid};
pub use error::{Error, ParseError, Result};
pub use filter::{PowerFilter, smooth};
pub use parser::parse;
pub use record::{
    AccessPointRecord, BearingEstimate, LogEntry, Observation, Power, Record, RecordKind,
    RegistryEntry, Sample,
};
pub use sensor::{SensorLineSource, SensorReader};
pub use storage::{ObservationStore, StoreError};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::aggregator::{CaptureOptions, CaptureStats};
    pub use crate::config::Settings;
    pub use crate::error::{Error, Result};
    pub use crate::record::{BearingEstimate, LogEntry, Power, RegistryEntry};
    pub use crate::sensor::SensorReader;
    pub use crate::storage::{ObservationStore, StoreError};
}
