//! Current reader location, shared between whoever selects it and the reader
//!
//! Backed by a `watch` channel: the selector writes a whole `Location`
//! value and the scan processor reads it once per scan, so a scan always
//! sees either the old or the new location.

use crate::domain::types::Location;
use crate::infra::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Write side, held by the UI or CLI
pub struct LocationSelector {
    tx: watch::Sender<Location>,
    metrics: Option<Arc<Metrics>>,
}

impl LocationSelector {
    pub fn new(initial: Location) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, metrics: None }
    }

    /// Count location changes in metrics
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Select a location; returns true if it changed
    pub fn set(&self, location: Location) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == location {
                false
            } else {
                *current = location;
                true
            }
        });

        if changed {
            if let Some(ref metrics) = self.metrics {
                metrics.record_location_change();
            }
            info!(location = %location, "location_changed");
        }
        changed
    }

    pub fn current(&self) -> Location {
        *self.tx.borrow()
    }

    /// Read handle for the scan processor
    pub fn subscribe(&self) -> LocationReader {
        LocationReader { rx: self.tx.subscribe() }
    }
}

/// Read side, owned by the scan processor
#[derive(Clone)]
pub struct LocationReader {
    rx: watch::Receiver<Location>,
}

impl LocationReader {
    /// Reader pinned to a single location, for tools and tests that have no selector
    pub fn fixed(location: Location) -> Self {
        let (tx, rx) = watch::channel(location);
        // Receiver keeps the last value after the sender is gone
        drop(tx);
        Self { rx }
    }

    pub fn current(&self) -> Location {
        *self.rx.borrow()
    }
}
