//! Services - scan processing logic and shared state
//!
//! This module contains the core business logic services:
//! - `direction_tracker` - Per-(tag, location) enter/exit alternation
//! - `location` - Current reader location shared with the reader task
//! - `scan_processor` - Validates a line, decides direction, logs the scan

pub mod direction_tracker;
pub mod location;
pub mod scan_processor;

// Re-export commonly used types
pub use direction_tracker::{DirectionTracker, SharedDirections};
pub use location::{LocationReader, LocationSelector};
pub use scan_processor::{ScanControls, ScanPipeline, ScanProcessor};
