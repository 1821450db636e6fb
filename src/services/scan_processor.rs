//! Scan processor - turns one raw reader line into a logged scan
//!
//! Per line: clean and validate the tag, read the current location once,
//! advance the direction state, resolve the name and append the event.
//! Rejected lines produce no event and leave all state untouched.

use crate::domain::types::{ScanEvent, Tag};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::name_db::NameDirectory;
use crate::io::scan_log::{LogSnapshot, ScanLog, ScanLogError};
use crate::services::direction_tracker::{DirectionTracker, SharedDirections};
use crate::services::location::{LocationReader, LocationSelector};
use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ScanProcessor {
    directions: SharedDirections,
    location: LocationReader,
    names: Arc<NameDirectory>,
    log: ScanLog,
    metrics: Arc<Metrics>,
}

impl ScanProcessor {
    pub fn new(
        directions: SharedDirections,
        location: LocationReader,
        names: Arc<NameDirectory>,
        log: ScanLog,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { directions, location, names, log, metrics }
    }

    /// Process a line stamped with the current local time
    pub fn process_line(&mut self, raw: &str) -> Result<Option<ScanEvent>, ScanLogError> {
        self.process_line_at(raw, Local::now().naive_local())
    }

    pub fn process_line_at(
        &mut self,
        raw: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Option<ScanEvent>, ScanLogError> {
        let line = raw.trim();
        self.metrics.record_line_received();

        let Some(tag) = Tag::parse(line) else {
            if !line.is_empty() {
                self.metrics.record_tag_rejected();
                debug!(raw = ?line, "tag_rejected");
            }
            return Ok(None);
        };

        let location = self.location.current();
        let direction = self.directions.lock().next(&tag, location);
        let name = self.names.resolve(&tag).to_string();

        let event = ScanEvent { timestamp, tag, name, location, direction };
        self.log.append(&event)?;
        self.metrics.record_scan_logged();

        info!(
            tag = %event.tag,
            name = %event.name,
            location = %event.location,
            direction = %event.direction_label(),
            "scan_logged"
        );
        Ok(Some(event))
    }
}

/// Handles a front end keeps once the processor has moved into the reader task
pub struct ScanControls {
    pub location: LocationSelector,
    pub directions: SharedDirections,
    pub scan_log: ScanLog,
    pub names: Arc<NameDirectory>,
    pub metrics: Arc<Metrics>,
}

impl ScanControls {
    /// Explicitly forget all direction state
    pub fn reset_directions(&self) {
        self.directions.lock().reset();
        self.metrics.record_direction_reset();
    }

    /// Truncate the scan log; direction state is left as it is
    pub fn clear_log(&self) -> Result<(), ScanLogError> {
        self.scan_log.clear()
    }
}

/// The processor plus its controls, built from config
pub struct ScanPipeline {
    pub processor: ScanProcessor,
    pub controls: ScanControls,
}

impl ScanPipeline {
    /// Load the name database, prepare the scan log and wire the processor
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let metrics = Arc::new(Metrics::new());
        let names = Arc::new(NameDirectory::load_or_empty(config.name_database_file()));
        let scan_log = ScanLog::new(config.scan_log_file());

        if config.clear_on_start() {
            scan_log.clear().context("Failed to reset scan log at startup")?;
        }

        let mut tracker = DirectionTracker::new();
        if config.restore_directions() {
            if let LogSnapshot::Entries(entries) =
                scan_log.snapshot().context("Failed to read scan log for direction restore")?
            {
                tracker.restore(&entries);
            }
        }
        let directions = tracker.shared();

        let location =
            LocationSelector::new(config.initial_location()).with_metrics(metrics.clone());

        let processor = ScanProcessor::new(
            directions.clone(),
            location.subscribe(),
            names.clone(),
            scan_log.clone(),
            metrics.clone(),
        );

        Ok(Self {
            processor,
            controls: ScanControls { location, directions, scan_log, names, metrics },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Direction, Location};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap().and_hms_opt(8, minute, 0).unwrap()
    }

    fn pipeline_in(dir: &std::path::Path) -> ScanPipeline {
        let config = Config::default().with_files(
            dir.join("scan_log.csv").display().to_string(),
            dir.join("rfid_database.csv").display().to_string(),
        );
        ScanPipeline::from_config(&config).unwrap()
    }

    #[test]
    fn test_invalid_line_has_no_effect() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline_in(dir.path());

        assert!(pipeline.processor.process_line_at("bad\n", at(0)).unwrap().is_none());
        assert!(pipeline.processor.process_line_at("", at(0)).unwrap().is_none());

        assert!(pipeline.controls.directions.lock().is_empty());
        assert_eq!(pipeline.controls.scan_log.snapshot().unwrap(), LogSnapshot::Entries(Vec::new()));
        let metrics = pipeline.controls.metrics.snapshot();
        assert_eq!(metrics.lines_received, 2);
        assert_eq!(metrics.tags_rejected, 1);
    }

    #[test]
    fn test_location_read_at_scan_time() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline_in(dir.path());

        let first = pipeline.processor.process_line_at("A1B2C3D4", at(0)).unwrap().unwrap();
        assert_eq!(first.direction_label(), "entered the school building");

        pipeline.controls.location.set(Location::Bus);
        let second = pipeline.processor.process_line_at("A1B2C3D4", at(1)).unwrap().unwrap();
        assert_eq!(second.location, Location::Bus);
        assert_eq!(second.direction_label(), "got on the bus");
    }

    #[test]
    fn test_names_resolved_from_database() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rfid_database.csv"), "hex_id,name\nA1B2C3D4,Ada\n").unwrap();
        let mut pipeline = pipeline_in(dir.path());

        let known = pipeline.processor.process_line_at("A1B2C3D4", at(0)).unwrap().unwrap();
        let unknown = pipeline.processor.process_line_at("FFFF0000", at(0)).unwrap().unwrap();
        assert_eq!(known.name, "Ada");
        assert_eq!(unknown.name, "Unknown");
    }

    #[test]
    fn test_clearing_log_keeps_direction_state() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline_in(dir.path());

        pipeline.processor.process_line_at("A1B2C3D4", at(0)).unwrap();
        pipeline.controls.clear_log().unwrap();
        let after_clear = pipeline.processor.process_line_at("A1B2C3D4", at(1)).unwrap().unwrap();
        assert_eq!(after_clear.direction, Direction::Exit);

        pipeline.controls.reset_directions();
        let after_reset = pipeline.processor.process_line_at("A1B2C3D4", at(2)).unwrap().unwrap();
        assert_eq!(after_reset.direction, Direction::Enter);
        assert_eq!(pipeline.controls.metrics.snapshot().direction_resets, 1);
    }

    #[test]
    fn test_restore_directions_from_existing_log() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("scan_log.csv");
        fs::write(
            &log_path,
            "timestamp,tag,name,direction\n2024-09-02 07:00:00,A1B2C3D4,Unknown,got on the bus\n",
        )
        .unwrap();

        let config = Config::default()
            .with_files(
                log_path.display().to_string(),
                dir.path().join("rfid_database.csv").display().to_string(),
            )
            .with_clear_on_start(false)
            .with_restore_directions(true)
            .with_initial_location(Location::Bus);
        let mut pipeline = ScanPipeline::from_config(&config).unwrap();

        let event = pipeline.processor.process_line_at("A1B2C3D4", at(0)).unwrap().unwrap();
        assert_eq!(event.direction_label(), "got off the bus");
    }

    #[test]
    fn test_clear_on_start_writes_header() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("scan_log.csv");
        fs::write(&log_path, "timestamp,tag,name,direction\nold,row,here,x\n").unwrap();

        let _pipeline = pipeline_in(dir.path());
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "timestamp,tag,name,direction\n");
    }
}
