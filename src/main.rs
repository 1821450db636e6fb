//! RFID attendance logger - headless reader
//!
//! Reads tags from the serial RFID reader (or stdin with `--stdin`), decides
//! enter/exit per tag and location, and appends every scan to the CSV log.
//!
//! Module structure:
//! - `domain/` - Tags, locations, scan events
//! - `io/` - Serial reader, scan log, name database
//! - `services/` - Direction tracking, location selection, scan processing
//! - `infra/` - Config, logging, metrics

use clap::Parser;
use rfid_attendance::domain::Location;
use rfid_attendance::infra::{logging, shutdown, Config};
use rfid_attendance::io::SerialReader;
use rfid_attendance::services::ScanPipeline;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// RFID attendance logger - records school and bus arrivals/departures
#[derive(Parser, Debug)]
#[command(name = "rfid-attendance", version, about)]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE or config/dev.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Location to start in, overriding the config (school or bus)
    #[arg(short, long)]
    location: Option<Location>,

    /// Read tag lines from standard input instead of the serial port
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Config decides the log format, so load it before logging and report failures after
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let loaded = Config::from_file(&config_path);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    logging::init_stdout(config.log_format())?;
    if let Err(e) = loaded {
        warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
    }

    if let Some(location) = args.location {
        config = config.with_initial_location(location);
    }

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git_hash = %env!("GIT_HASH"),
        "rfid_attendance_starting"
    );
    info!(
        config_file = %config.config_file(),
        serial_device = %config.serial_device(),
        serial_baud = %config.serial_baud(),
        scan_log = %config.scan_log_file(),
        name_database = %config.name_database_file(),
        location = %config.initial_location(),
        source = if args.stdin { "stdin" } else { "serial" },
        "config_loaded"
    );

    let ScanPipeline { mut processor, controls } = ScanPipeline::from_config(&config)?;
    let metrics = controls.metrics.clone();
    info!(known_tags = controls.names.len(), "pipeline_ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown::shutdown_on(tokio::signal::ctrl_c(), shutdown_tx));

    let metrics_reporter = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_reporter.report().log();
        }
    });

    let reader = SerialReader::new(&config);
    let result = if args.stdin {
        reader.read_lines(tokio::io::stdin(), &mut processor, shutdown_rx).await
    } else {
        reader.run(&mut processor, shutdown_rx).await
    };

    metrics.report().log();

    let code = match result {
        Ok(exit) => {
            info!(exit = ?exit, "rfid_attendance_stopped");
            0
        }
        Err(e) => {
            error!(error = %e, "serial_reader_failed");
            1
        }
    };

    if args.stdin {
        // tokio's stdin keeps a blocking read thread alive that would stall runtime shutdown
        std::process::exit(code);
    }
    if code != 0 {
        anyhow::bail!("serial reader stopped with an error");
    }
    Ok(())
}
