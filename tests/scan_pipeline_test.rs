//! End-to-end tests: reader lines through the pipeline into the CSV log

use rfid_attendance::domain::Location;
use rfid_attendance::infra::Config;
use rfid_attendance::io::{LogEntry, LogSnapshot, ReaderExit, SerialReader};
use rfid_attendance::services::ScanPipeline;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::watch;

fn config_in(dir: &Path) -> Config {
    Config::default().with_files(
        dir.join("scan_log.csv").display().to_string(),
        dir.join("rfid_database.csv").display().to_string(),
    )
}

fn fast_reader(config: &Config) -> SerialReader {
    SerialReader::new(config).with_timings(Duration::from_millis(20), Duration::ZERO)
}

fn rows(pipeline: &ScanPipeline) -> Vec<LogEntry> {
    match pipeline.controls.scan_log.snapshot().unwrap() {
        LogSnapshot::Entries(entries) => entries,
        LogSnapshot::Missing => panic!("scan log missing"),
    }
}

#[tokio::test]
async fn test_school_enter_exit_enter() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("rfid_database.csv"), "hex_id,name\nA1B2C3D4,Ada Lovelace\n").unwrap();
    let config = config_in(dir.path());
    let mut pipeline = ScanPipeline::from_config(&config).unwrap();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let input: &[u8] = b"A1B2C3D4\nA1B2C3D4\nbad\nA1B2C3D4\n";
    let exit = fast_reader(&config)
        .read_lines(input, &mut pipeline.processor, shutdown_rx)
        .await
        .unwrap();
    assert_eq!(exit, ReaderExit::EndOfStream);

    let rows = rows(&pipeline);
    let directions: Vec<&str> = rows.iter().map(|r| r.direction.as_str()).collect();
    assert_eq!(
        directions,
        vec!["entered the school building", "left the school building", "entered the school building"]
    );
    assert!(rows.iter().all(|r| r.tag == "A1B2C3D4" && r.name == "Ada Lovelace"));

    let raw = fs::read_to_string(dir.path().join("scan_log.csv")).unwrap();
    assert!(raw.starts_with("timestamp,tag,name,direction\n"));
    assert_eq!(raw.lines().count(), 4);

    let metrics = pipeline.controls.metrics.snapshot();
    assert_eq!(metrics.scans_logged, 3);
    assert_eq!(metrics.tags_rejected, 1);
}

#[tokio::test]
async fn test_location_switch_mid_stream() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let mut pipeline = ScanPipeline::from_config(&config).unwrap();
    let reader = fast_reader(&config);

    let (_tx, rx) = watch::channel(false);
    let first: &[u8] = b"\x02A1B2C3D4\x03\r\n";
    reader.read_lines(first, &mut pipeline.processor, rx).await.unwrap();

    assert!(pipeline.controls.location.set(Location::Bus));
    let (_tx, rx) = watch::channel(false);
    let second: &[u8] = b"A1B2C3D4\nA1B2C3D4\nA1B2C3D4\n";
    reader.read_lines(second, &mut pipeline.processor, rx).await.unwrap();

    let directions: Vec<String> = rows(&pipeline).into_iter().map(|r| r.direction).collect();
    assert_eq!(
        directions,
        vec![
            "entered the school building",
            "got on the bus",
            "got off the bus",
            "got on the bus",
        ]
    );
    assert_eq!(rows(&pipeline)[0].name, "Unknown");
    assert_eq!(pipeline.controls.metrics.snapshot().location_changes, 1);
}

#[tokio::test]
async fn test_clear_then_scan_writes_fresh_header() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let mut pipeline = ScanPipeline::from_config(&config).unwrap();
    let reader = fast_reader(&config);

    let (_tx, rx) = watch::channel(false);
    reader.read_lines(&b"A1B2C3D4\n"[..], &mut pipeline.processor, rx).await.unwrap();
    pipeline.controls.clear_log().unwrap();
    assert!(rows(&pipeline).is_empty());

    let (_tx, rx) = watch::channel(false);
    reader.read_lines(&b"A1B2C3D4\n"[..], &mut pipeline.processor, rx).await.unwrap();

    let rows = rows(&pipeline);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].direction, "left the school building");
}
