//! End-to-end pipeline tests against every store backend.

use std::io::Cursor;

use chrono::{Duration, Utc};
use datasamalen_core::config::defaults::PROBE_COLUMN;
use datasamalen_core::{
    CaptureOptions, Error, ObservationStore, ParseError, SensorReader, clear_observations,
    ingest, list_devices, query_bearing, run_capture,
};
use datasamalen_storage::{MemoryObservationStore, RedbObservationStore};

const DEVICE: &str = "00:0F:B5:32:31:31";

fn client_line(mac: &str, power: i32, probes: &str) -> String {
    let head = format!(
        "C 2013-06-01 12:00:01 00:14:6C:7E:40:80 {} {:>4}   0 - 1    0   12",
        mac, power
    );
    format!("{:<width$}{}", head, probes, width = PROBE_COLUMN)
}

fn sensor(lines: &str) -> SensorReader {
    SensorReader::from_reader(Cursor::new(lines.as_bytes().to_vec()))
}

fn stores() -> Vec<(&'static str, Box<dyn ObservationStore>)> {
    vec![
        ("memory", Box::new(MemoryObservationStore::new())),
        ("redb", Box::new(RedbObservationStore::memory().unwrap())),
    ]
}

#[test]
fn test_probes_merge_into_one_registry_row() {
    for (name, store) in stores() {
        let mut sensor = SensorReader::disabled();
        let now = Utc::now();
        ingest(&client_line(DEVICE, -50, "net1"), &mut sensor, &*store, now).unwrap();
        ingest(&client_line(DEVICE, -50, "net2"), &mut sensor, &*store, now).unwrap();

        let devices = list_devices(&*store).unwrap();
        assert_eq!(devices.len(), 1, "{}", name);
        let probes: Vec<&str> = devices[0].probes.iter().map(String::as_str).collect();
        assert_eq!(probes, vec!["net1", "net2"], "{}", name);
        assert_eq!(store.log_entry_count().unwrap(), 2, "{}", name);
    }
}

#[test]
fn test_bearing_from_angled_window() {
    for (name, store) in stores() {
        let mut sensor = sensor("10\r\n20\r\n30\r\n");
        let now = Utc::now();
        for _ in 0..3 {
            ingest(&client_line(DEVICE, -40, ""), &mut sensor, &*store, now).unwrap();
        }

        let estimate = query_bearing(
            &*store,
            DEVICE,
            Duration::seconds(10),
            now + Duration::seconds(1),
        )
        .unwrap();
        assert_eq!(estimate.peak_power, Some(-40), "{}", name);
        let bearing = estimate.bearing.unwrap();
        assert!((bearing - 20.0).abs() < 1e-9, "{}: {}", name, bearing);
    }
}

#[test]
fn test_missing_angle_keeps_peak() {
    for (name, store) in stores() {
        // The second line is not an angle.
        let mut sensor = sensor("10\r\nnoise\r\n30\r\n");
        let now = Utc::now();
        for power in [-60, -40, -60] {
            ingest(&client_line(DEVICE, power, ""), &mut sensor, &*store, now).unwrap();
        }

        let estimate =
            query_bearing(&*store, DEVICE, Duration::seconds(10), now).unwrap();
        // Smoothed: -56, -48, -56
        assert_eq!(estimate.peak_power, Some(-48), "{}", name);
        assert_eq!(estimate.bearing, None, "{}", name);
    }
}

#[test]
fn test_window_excludes_old_observations() {
    for (name, store) in stores() {
        let mut sensor = SensorReader::disabled();
        let then = Utc::now() - Duration::seconds(60);
        ingest(&client_line(DEVICE, -40, ""), &mut sensor, &*store, then).unwrap();

        let estimate =
            query_bearing(&*store, DEVICE, Duration::seconds(10), Utc::now()).unwrap();
        assert_eq!(estimate.peak_power, None, "{}", name);
        assert_eq!(estimate.bearing, None, "{}", name);
    }
}

#[test]
fn test_sentinel_power_registers_without_logging() {
    for (name, store) in stores() {
        let mut sensor = SensorReader::disabled();
        let sample = ingest(&client_line(DEVICE, -1, "lab"), &mut sensor, &*store, Utc::now())
            .unwrap()
            .unwrap();
        assert!(sample.observation.power.is_none(), "{}", name);
        assert_eq!(store.log_entry_count().unwrap(), 0, "{}", name);
        assert_eq!(list_devices(&*store).unwrap().len(), 1, "{}", name);
    }
}

#[test]
fn test_access_point_line_consumes_angle() {
    for (name, store) in stores() {
        let mut sensor = sensor("5\r\n25\r\n");
        let now = Utc::now();
        let ap = ingest("A 2013-06-01 12:00:01 00:14:6C:7E:40:80", &mut sensor, &*store, now)
            .unwrap();
        assert!(ap.is_none(), "{}", name);

        let sample = ingest(&client_line(DEVICE, -40, ""), &mut sensor, &*store, now)
            .unwrap()
            .unwrap();
        assert_eq!(sample.angle, Some(25), "{}", name);
    }
}

#[test]
fn test_clear_keeps_registry() {
    for (name, store) in stores() {
        let mut sensor = SensorReader::disabled();
        let now = Utc::now();
        ingest(&client_line(DEVICE, -40, "net1"), &mut sensor, &*store, now).unwrap();
        ingest(&client_line("AA:BB:CC:DD:EE:FF", -45, ""), &mut sensor, &*store, now)
            .unwrap();

        assert_eq!(clear_observations(&*store).unwrap(), 2, "{}", name);
        let estimate = query_bearing(&*store, DEVICE, Duration::seconds(10), now).unwrap();
        assert_eq!(estimate.peak_power, None, "{}", name);
        assert_eq!(list_devices(&*store).unwrap().len(), 2, "{}", name);
    }
}

#[test]
fn test_run_capture_over_both_stores() {
    for (name, store) in stores() {
        let capture = format!(
            "{}\n\nA 2013-06-01 12:00:01 00:14:6C:7E:40:80\nX broken\n{}\n",
            client_line(DEVICE, -40, "net1"),
            client_line(DEVICE, -42, "net2"),
        );
        let mut sensor = sensor("10\r\n20\r\n30\r\n");

        let stats = run_capture(
            Cursor::new(capture.clone()),
            &mut sensor,
            &*store,
            CaptureOptions::default(),
        )
        .unwrap();
        assert_eq!(stats.lines, 4, "{}", name);
        assert_eq!(stats.clients, 2, "{}", name);
        assert_eq!(stats.access_points, 1, "{}", name);
        assert_eq!(stats.malformed, 1, "{}", name);
        assert_eq!(stats.logged, 2, "{}", name);
        assert_eq!(stats.with_angle, 2, "{}", name);

        let strict = run_capture(
            Cursor::new(capture),
            &mut SensorReader::disabled(),
            &*store,
            CaptureOptions { strict: true },
        );
        assert!(
            matches!(strict, Err(Error::Parse(ParseError::UnknownRecordKind(_)))),
            "{}",
            name
        );
    }
}
