//! RFID attendance logger library
//!
//! Exposes the scan pipeline for the headless reader, the terminal UI and
//! integration tests.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
