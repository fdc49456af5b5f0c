//! Command-line interface for the Datasamalen bearing pipeline.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datasamalen_core::config::{Settings, env_vars};
use datasamalen_core::{
    BearingEstimate, CaptureOptions, SensorReader, clear_observations, list_devices,
    query_bearing, run_capture,
};
use datasamalen_storage::{RedbObservationStore, RedbStoreConfig};

/// Datasamalen - locate Wi-Fi clients from a directional antenna sweep.
#[derive(Parser, Debug)]
#[command(name = "datasamalen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Observation database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to ./datasamalen.toml if present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest capture lines, tagging each with the current sensor angle.
    Capture {
        /// Capture file to read instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Angle sensor device (for example /dev/ttyUSB0).
        #[arg(short, long)]
        sensor: Option<PathBuf>,
        /// How long to wait for each sensor line.
        #[arg(long)]
        sensor_timeout_ms: Option<u64>,
        /// Stop at the first malformed line.
        #[arg(long)]
        strict: bool,
    },
    /// Estimate peak power and bearing of a device.
    Bearing {
        /// Device MAC address.
        #[arg(required = true)]
        mac: String,
        /// Trailing window in seconds.
        #[arg(short, long)]
        window: Option<u64>,
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
    /// List registered devices and the networks they probed for.
    Devices {
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove all logged observations. Registered devices are kept.
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(db) = args.db {
        settings.db_path = db;
    }
    tracing::debug!(category = "config", ?settings, "Settings resolved");

    match args.command {
        Command::Capture {
            input,
            sensor,
            sensor_timeout_ms,
            strict,
        } => {
            if sensor.is_some() {
                settings.sensor.device = sensor;
            }
            if let Some(timeout_ms) = sensor_timeout_ms {
                settings.sensor.timeout_ms = timeout_ms;
            }
            settings.capture.strict |= strict;
            run_capture_cmd(&settings, input)
        }
        Command::Bearing { mac, window, json } => {
            if let Some(window) = window {
                settings.query.window_secs = window;
            }
            run_bearing(&settings, &mac, json)
        }
        Command::Devices { json } => run_devices(&settings, json),
        Command::Clear => run_clear(&settings),
    }
}

fn init_logging(verbose: bool) {
    // JSON logs for production/container environments
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose {
        "datasamalen=debug"
    } else {
        "datasamalen=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // Logs go to stderr, stdout carries command output.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .init();
    }
}

fn open_store(settings: &Settings) -> Result<RedbObservationStore> {
    let path = settings.db_path.to_string_lossy().into_owned();
    RedbObservationStore::new(RedbStoreConfig::new(path))
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))
}

fn run_capture_cmd(settings: &Settings, input: Option<PathBuf>) -> Result<()> {
    let store = open_store(settings)?;

    let mut sensor = match &settings.sensor.device {
        Some(device) => {
            let port = File::open(device)
                .with_context(|| format!("Failed to open sensor {}", device.display()))?;
            let timeout = Duration::from_millis(settings.sensor.timeout_ms);
            SensorReader::spawn(port, timeout).context("Failed to start sensor reader")?
        }
        None => SensorReader::disabled(),
    };

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let options = CaptureOptions {
        strict: settings.capture.strict,
    };
    let stats = run_capture(reader, &mut sensor, &store, options).context("Capture failed")?;
    println!("{}", stats);
    Ok(())
}

fn run_bearing(settings: &Settings, mac: &str, json: bool) -> Result<()> {
    let store = open_store(settings)?;
    let secs = i64::try_from(settings.query.window_secs).context("Window too large")?;

    let estimate = query_bearing(&store, mac, chrono::Duration::seconds(secs), chrono::Utc::now())
        .with_context(|| format!("Failed to query bearing of {}", mac))?;

    if json {
        let value = serde_json::json!({
            "device_id": mac,
            "window_secs": settings.query.window_secs,
            "peak_power": estimate.peak_power,
            "bearing": estimate.bearing,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_estimate(mac, &estimate);
    }
    Ok(())
}

fn print_estimate(mac: &str, estimate: &BearingEstimate) {
    println!("Device:  {}", mac);
    match estimate.peak_power {
        Some(power) => println!("Peak:    {} dBm", power),
        None => println!("Peak:    -"),
    }
    match estimate.bearing {
        Some(bearing) => println!("Bearing: {:.1}", bearing),
        None => println!("Bearing: -"),
    }
}

fn run_devices(settings: &Settings, json: bool) -> Result<()> {
    let store = open_store(settings)?;
    let devices = list_devices(&store).context("Failed to list devices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No devices registered.");
        return Ok(());
    }
    for device in &devices {
        let probes: Vec<&str> = device.probes.iter().map(String::as_str).collect();
        println!("{}  {}", device.device_id, probes.join(", "));
    }
    Ok(())
}

fn run_clear(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let removed = clear_observations(&store).context("Failed to clear observations")?;
    println!("Removed {} observations.", removed);
    Ok(())
}
