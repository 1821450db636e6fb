//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `serial_reader` - Line reader for the serial RFID reader (or any byte stream)
//! - `scan_log` - Append-only CSV scan log
//! - `name_db` - Tag to name directory loaded from CSV

pub mod name_db;
pub mod scan_log;
pub mod serial_reader;

// Re-export commonly used types
pub use name_db::NameDirectory;
pub use scan_log::{LogEntry, LogSnapshot, ScanLog, ScanLogError};
pub use serial_reader::{ReaderError, ReaderExit, SerialReader};
