//! Per-(tag, location) enter/exit alternation
//!
//! The first scan of a tag at a location is an arrival; each further scan at
//! the same location flips the direction. Locations are tracked
//! independently, so a student can be "in" the school and "on" the bus at
//! the same time as far as this state is concerned.
//!
//! State lives until `reset()` is called. Clearing the scan log does not
//! touch it.

use crate::domain::types::{Direction, Location, Tag};
use crate::io::scan_log::LogEntry;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Direction state shared between the reader task and the UI
pub type SharedDirections = Arc<Mutex<DirectionTracker>>;

#[derive(Debug, Default)]
pub struct DirectionTracker {
    last: FxHashMap<(Tag, Location), Direction>,
}

impl DirectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedDirections {
        Arc::new(Mutex::new(self))
    }

    /// Decide the direction for this scan and record it
    pub fn next(&mut self, tag: &Tag, location: Location) -> Direction {
        let key = (tag.clone(), location);
        let direction = match self.last.get(&key) {
            None | Some(Direction::Exit) => Direction::Enter,
            Some(Direction::Enter) => Direction::Exit,
        };
        self.last.insert(key, direction);
        direction
    }

    /// Last direction recorded for a pair, if any
    pub fn last(&self, tag: &Tag, location: Location) -> Option<Direction> {
        self.last.get(&(tag.clone(), location)).copied()
    }

    /// Forget every pair; the next scan of any tag is an arrival again
    pub fn reset(&mut self) {
        let pairs = self.last.len();
        self.last.clear();
        info!(pairs = pairs, "direction_state_reset");
    }

    /// Seed state from existing log rows, oldest first
    ///
    /// Returns the number of rows applied. Rows with an invalid tag or a
    /// label that matches no location are skipped.
    pub fn restore<'a, I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut applied = 0;
        for entry in entries {
            let Some(tag) = Tag::parse(&entry.tag) else {
                debug!(tag = %entry.tag, "restore_skipped_invalid_tag");
                continue;
            };
            let Some((location, direction)) = Location::from_label(&entry.direction) else {
                debug!(direction = %entry.direction, "restore_skipped_unknown_label");
                continue;
            };
            self.last.insert((tag, location), direction);
            applied += 1;
        }
        info!(rows = applied, pairs = self.last.len(), "direction_state_restored");
        applied
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(raw: &str) -> Tag {
        Tag::parse(raw).unwrap()
    }

    fn entry(tag: &str, direction: &str) -> LogEntry {
        LogEntry {
            timestamp: "2024-09-02 08:00:00".to_string(),
            tag: tag.to_string(),
            name: "Unknown".to_string(),
            direction: direction.to_string(),
        }
    }

    #[test]
    fn test_alternates_per_pair() {
        let mut tracker = DirectionTracker::new();
        let t = tag("A1B2C3D4");

        let directions: Vec<Direction> =
            (0..5).map(|_| tracker.next(&t, Location::School)).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Enter,
                Direction::Exit,
                Direction::Enter,
                Direction::Exit,
                Direction::Enter
            ]
        );
    }

    #[test]
    fn test_locations_are_independent() {
        let mut tracker = DirectionTracker::new();
        let t = tag("X1234567");

        assert_eq!(tracker.next(&t, Location::School), Direction::Enter);
        assert_eq!(tracker.next(&t, Location::Bus), Direction::Enter);
        assert_eq!(tracker.next(&t, Location::School), Direction::Exit);
        assert_eq!(tracker.next(&t, Location::Bus), Direction::Exit);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_tags_are_independent() {
        let mut tracker = DirectionTracker::new();
        let a = tag("AAAA1111");
        let b = tag("BBBB2222");

        assert_eq!(tracker.next(&a, Location::Bus), Direction::Enter);
        assert_eq!(tracker.next(&b, Location::Bus), Direction::Enter);
        assert_eq!(tracker.next(&a, Location::Bus), Direction::Exit);
        assert_eq!(tracker.last(&b, Location::Bus), Some(Direction::Enter));
    }

    #[test]
    fn test_labels_never_cross_locations() {
        let mut tracker = DirectionTracker::new();
        let t = tag("A1B2C3D4");
        for _ in 0..4 {
            let label = Location::Bus.label(tracker.next(&t, Location::Bus));
            assert!(!label.contains("school"));
        }
        for _ in 0..4 {
            let label = Location::School.label(tracker.next(&t, Location::School));
            assert!(!label.contains("bus"));
        }
    }

    #[test]
    fn test_reset_restarts_alternation() {
        let mut tracker = DirectionTracker::new();
        let t = tag("A1B2C3D4");
        tracker.next(&t, Location::School);
        tracker.reset();

        assert!(tracker.is_empty());
        assert_eq!(tracker.next(&t, Location::School), Direction::Enter);
    }

    #[test]
    fn test_restore_from_log_entries() {
        let mut tracker = DirectionTracker::new();
        let entries = vec![
            entry("A1B2C3D4", "entered the school building"),
            entry("A1B2C3D4", "got on the bus"),
            entry("A1B2C3D4", "left the school building"),
            entry("bad", "got on the bus"),
            entry("X1234567", "danced"),
        ];

        assert_eq!(tracker.restore(&entries), 3);

        let t = tag("A1B2C3D4");
        assert_eq!(tracker.next(&t, Location::School), Direction::Enter);
        assert_eq!(tracker.next(&t, Location::Bus), Direction::Exit);
    }
}
