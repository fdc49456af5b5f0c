//! Typed capture records and the entries derived from them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults::{POWER_MAX, POWER_MIN};

/// A usable signal strength reading in dBm.
///
/// Only values strictly between -127 and -1 are representable; the capture
/// tool emits 0, -1 and -127 and below as "no reading" sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Power(i32);

impl Power {
    /// Returns `None` for sentinel values outside the open usable range.
    pub fn new(dbm: i32) -> Option<Self> {
        (POWER_MIN < dbm && dbm < POWER_MAX).then_some(Power(dbm))
    }

    pub fn dbm(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Power {
    type Error = String;

    fn try_from(dbm: i32) -> Result<Self, Self::Error> {
        Power::new(dbm).ok_or_else(|| format!("power {} outside ({}, {})", dbm, POWER_MIN, POWER_MAX))
    }
}

impl From<Power> for i32 {
    fn from(power: Power) -> Self {
        power.0
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dBm", self.0)
    }
}

/// Kind tag of a capture line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Client,
    AccessPoint,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Client => write!(f, "client"),
            RecordKind::AccessPoint => write!(f, "access point"),
        }
    }
}

/// A client probe observation as read from one capture line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// BSSID the client is associated with (or the scrubber's placeholder).
    pub ap_id: String,
    /// Client MAC address.
    pub device_id: String,
    pub power: Option<Power>,
    /// Network names the client probed for.
    pub probes: BTreeSet<String>,
}

/// Access-point line. No fields are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessPointRecord;

/// One parsed capture line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Client(Observation),
    AccessPoint(AccessPointRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Client(_) => RecordKind::Client,
            Record::AccessPoint(_) => RecordKind::AccessPoint,
        }
    }
}

/// A client observation tagged with its sensor angle and ingest time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub observation: Observation,
    pub angle: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// The log entry for this sample, if it carries a usable power reading.
    pub fn log_entry(&self) -> Option<LogEntry> {
        self.observation.power.map(|power| LogEntry {
            device_id: self.observation.device_id.clone(),
            timestamp: self.timestamp,
            power,
            angle: self.angle,
        })
    }

    pub fn registry_entry(&self) -> RegistryEntry {
        RegistryEntry {
            device_id: self.observation.device_id.clone(),
            probes: self.observation.probes.clone(),
        }
    }
}

/// Immutable observation log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub power: Power,
    pub angle: Option<i32>,
}

/// Accumulated per-device attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub device_id: String,
    #[serde(default)]
    pub probes: BTreeSet<String>,
}

impl RegistryEntry {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            probes: BTreeSet::new(),
        }
    }

    pub fn with_probes<I, S>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probes.extend(probes.into_iter().map(Into::into));
        self
    }

    /// Union `probes` into this entry. Returns true if anything was added.
    pub fn merge_probes<'a, I>(&mut self, probes: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let before = self.probes.len();
        self.probes.extend(probes.into_iter().cloned());
        self.probes.len() > before
    }
}

/// Peak power and bearing over a trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BearingEstimate {
    /// Highest filtered power in the window, in whole dBm.
    pub peak_power: Option<i32>,
    /// Power-weighted center of gravity of the window's angles.
    pub bearing: Option<f64>,
}
