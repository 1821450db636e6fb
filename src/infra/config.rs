//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument (parsed by the binaries)
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every section is optional; missing keys fall back to the defaults below.

use crate::domain::types::Location;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_serial_device")]
    pub device: String,
    #[serde(default = "default_serial_baud")]
    pub baud: u32,
    /// Per-read timeout on the serial line
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pause between consecutive reads
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_serial_device(),
            baud: default_serial_baud(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_serial_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_serial_baud() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_scan_log")]
    pub scan_log: String,
    #[serde(default = "default_name_database")]
    pub name_database: String,
    /// Truncate the scan log to its header when the application starts
    #[serde(default = "default_clear_on_start")]
    pub clear_on_start: bool,
    /// Seed direction state from rows already in the scan log
    #[serde(default)]
    pub restore_directions: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            scan_log: default_scan_log(),
            name_database: default_name_database(),
            clear_on_start: default_clear_on_start(),
            restore_directions: false,
        }
    }
}

fn default_scan_log() -> String {
    "scan_log.csv".to_string()
}

fn default_name_database() -> String {
    "rfid_database.csv".to_string()
}

fn default_clear_on_start() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LocationConfig {
    #[serde(default)]
    pub initial: Location,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { refresh_interval_ms: default_refresh_interval_ms() }
    }
}

fn default_refresh_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Log destination for the terminal UI, which cannot share stdout
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: LogFormat::Text, file: default_log_file() }
    }
}

fn default_log_file() -> String {
    "rfid-attendance-tui.log".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    serial_device: String,
    serial_baud: u32,
    read_timeout_ms: u64,
    poll_interval_ms: u64,
    scan_log_file: String,
    name_database_file: String,
    clear_on_start: bool,
    restore_directions: bool,
    initial_location: Location,
    refresh_interval_ms: u64,
    metrics_interval_secs: u64,
    log_format: LogFormat,
    log_file: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            serial_device: toml_config.serial.device,
            serial_baud: toml_config.serial.baud,
            read_timeout_ms: toml_config.serial.read_timeout_ms,
            poll_interval_ms: toml_config.serial.poll_interval_ms,
            scan_log_file: toml_config.files.scan_log,
            name_database_file: toml_config.files.name_database,
            clear_on_start: toml_config.files.clear_on_start,
            restore_directions: toml_config.files.restore_directions,
            initial_location: toml_config.location.initial,
            refresh_interval_ms: toml_config.display.refresh_interval_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            log_format: toml_config.logging.format,
            log_file: toml_config.logging.file,
            config_file,
        }
    }

    /// Config file path: the `--config` value if given, else `CONFIG_FILE`, else the default
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults on failure
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn serial_device(&self) -> &str {
        &self.serial_device
    }

    pub fn serial_baud(&self) -> u32 {
        self.serial_baud
    }

    pub fn read_timeout_ms(&self) -> u64 {
        self.read_timeout_ms
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn scan_log_file(&self) -> &str {
        &self.scan_log_file
    }

    pub fn name_database_file(&self) -> &str {
        &self.name_database_file
    }

    pub fn clear_on_start(&self) -> bool {
        self.clear_on_start
    }

    pub fn restore_directions(&self) -> bool {
        self.restore_directions
    }

    pub fn initial_location(&self) -> Location {
        self.initial_location
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Override the initial location (e.g. from `--location`)
    pub fn with_initial_location(mut self, location: Location) -> Self {
        self.initial_location = location;
        self
    }

    /// Point the log and name database at explicit paths
    pub fn with_files(mut self, scan_log: impl Into<String>, name_database: impl Into<String>) -> Self {
        self.scan_log_file = scan_log.into();
        self.name_database_file = name_database.into();
        self
    }

    pub fn with_restore_directions(mut self, restore: bool) -> Self {
        self.restore_directions = restore;
        self
    }

    pub fn with_clear_on_start(mut self, clear: bool) -> Self {
        self.clear_on_start = clear;
        self
    }
}
