//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free scan counters
//! - `logging` - tracing subscriber setup
//! - `shutdown` - Signal to shutdown-channel forwarding

pub mod config;
pub mod logging;
pub mod metrics;
pub mod shutdown;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use metrics::{Metrics, MetricsSummary};
