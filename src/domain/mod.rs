//! Domain models - tags, locations and scan events
//!
//! This module contains the canonical data types used throughout the system:
//! - `Tag` - a validated RFID tag identifier
//! - `Location` - where the reader is installed (school or bus stop)
//! - `Direction` - whether a scan is an arrival or a departure
//! - `ScanEvent` - one logged scan

pub mod types;

pub use types::{clean_tag, is_valid_tag, Direction, Location, LogRow, ScanEvent, Tag};
