//! Observation ingest and bearing queries.
//!
//! Every function takes its store and sensor explicitly; nothing here holds
//! global state.

use std::fmt;
use std::io::BufRead;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::bearing::center_of_gravity;
use crate::error::{Error, Result};
use crate::filter;
use crate::parser;
use crate::record::{BearingEstimate, Record, RegistryEntry, Sample};
use crate::sensor::SensorReader;
use crate::storage::ObservationStore;

/// Ingest one capture line observed at `now`.
///
/// Exactly one sensor line is consumed for every line that parses, so the
/// sensor stays aligned with the capture stream. Access-point lines touch
/// nothing else and yield `Ok(None)`. Client lines are logged if they carry a
/// usable power reading, and their probes are merged into the registry.
pub fn ingest<S>(
    line: &str,
    sensor: &mut SensorReader,
    store: &S,
    now: DateTime<Utc>,
) -> Result<Option<Sample>>
where
    S: ObservationStore + ?Sized,
{
    let record = parser::parse(line)?;
    let angle = sensor.read_angle();

    let observation = match record {
        Record::Client(observation) => observation,
        Record::AccessPoint(_) => return Ok(None),
    };

    let sample = Sample {
        observation,
        angle,
        timestamp: now,
    };

    if let Some(entry) = sample.log_entry() {
        store.insert_log_entry(&entry)?;
    }
    upsert_registry(store, &sample)?;

    debug!(
        device_id = %sample.observation.device_id,
        power = ?sample.observation.power.map(|p| p.dbm()),
        angle = ?sample.angle,
        "Ingested client observation"
    );
    Ok(Some(sample))
}

fn upsert_registry<S>(store: &S, sample: &Sample) -> Result<()>
where
    S: ObservationStore + ?Sized,
{
    match store.find_registry_entry(&sample.observation.device_id)? {
        None => store.insert_registry_entry(&sample.registry_entry())?,
        Some(mut entry) => {
            entry.merge_probes(&sample.observation.probes);
            store.update_registry_entry(&entry)?;
        }
    }
    Ok(())
}

/// Peak power and bearing of `device_id` over the `window` before `now`.
///
/// Powers are smoothed and truncated to whole dBm before both the peak and
/// the bearing are taken. The bearing is only computed when every
/// observation in the window has an angle.
pub fn query_bearing<S>(
    store: &S,
    device_id: &str,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<BearingEstimate>
where
    S: ObservationStore + ?Sized,
{
    let entries = store.find_log_entries(device_id, now - window)?;
    if entries.is_empty() {
        return Ok(BearingEstimate::default());
    }

    let raw: Vec<i32> = entries.iter().map(|e| e.power.dbm()).collect();
    let powers: Vec<i32> = filter::smooth(&raw)?.into_iter().map(whole_dbm).collect();
    let peak_power = powers.iter().copied().max();

    let angles: Option<Vec<f64>> = entries.iter().map(|e| e.angle.map(f64::from)).collect();
    let Some(angles) = angles else {
        debug!(device_id, observations = entries.len(), "Window has observations without angle");
        return Ok(BearingEstimate {
            peak_power,
            bearing: None,
        });
    };

    let weights: Vec<f64> = powers.iter().map(|&p| f64::from(p)).collect();
    let bearing = match center_of_gravity(&weights, Some(&angles)) {
        Ok(bearing) => bearing,
        Err(e @ (Error::LengthMismatch { .. } | Error::DivisionByZero)) => {
            warn!(device_id, "No bearing available: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(BearingEstimate {
        peak_power,
        bearing,
    })
}

/// Truncate toward zero, ignoring floating-point noise around whole values.
fn whole_dbm(value: f64) -> i32 {
    let nearest = value.round();
    if (value - nearest).abs() < 1e-9 {
        nearest as i32
    } else {
        value.trunc() as i32
    }
}

/// Remove all observation log entries. The registry is kept.
pub fn clear_observations<S>(store: &S) -> Result<usize>
where
    S: ObservationStore + ?Sized,
{
    let removed = store.delete_all_log_entries()?;
    info!(removed, "Cleared observation log");
    Ok(removed)
}

/// All known devices and the networks they probed for.
pub fn list_devices<S>(store: &S) -> Result<Vec<RegistryEntry>>
where
    S: ObservationStore + ?Sized,
{
    Ok(store.list_registry_entries()?)
}

/// Options for [`run_capture`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Stop at the first malformed line instead of logging and skipping it.
    pub strict: bool,
}

/// Counters of a capture run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Non-blank lines read.
    pub lines: u64,
    pub clients: u64,
    pub access_points: u64,
    /// Client observations appended to the log.
    pub logged: u64,
    /// Client observations that carried an angle.
    pub with_angle: u64,
    pub malformed: u64,
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} clients ({} logged, {} with angle), {} access points, {} malformed",
            self.lines, self.clients, self.logged, self.with_angle, self.access_points, self.malformed
        )
    }
}

/// Ingest capture lines until `input` is exhausted.
///
/// Blank lines are skipped. Store failures always abort the run.
pub fn run_capture<R, S>(
    mut input: R,
    sensor: &mut SensorReader,
    store: &S,
    options: CaptureOptions,
) -> Result<CaptureStats>
where
    R: BufRead,
    S: ObservationStore + ?Sized,
{
    let mut stats = CaptureStats::default();
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        match ingest(&line, sensor, store, Utc::now()) {
            Ok(Some(sample)) => {
                stats.clients += 1;
                if sample.observation.power.is_some() {
                    stats.logged += 1;
                }
                if sample.angle.is_some() {
                    stats.with_angle += 1;
                }
            }
            Ok(None) => stats.access_points += 1,
            Err(Error::Parse(e)) if !options.strict => {
                warn!(line = line_no, "Skipping malformed capture line: {}", e);
                stats.malformed += 1;
            }
            Err(e) => {
                error!(line = line_no, "Capture aborted: {}", e);
                return Err(e);
            }
        }
    }

    info!(
        lines = stats.lines,
        clients = stats.clients,
        logged = stats.logged,
        malformed = stats.malformed,
        "Capture input exhausted"
    );
    Ok(stats)
}
