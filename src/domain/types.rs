//! Shared types for the attendance logger

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Shortest accepted tag after cleaning
pub const TAG_MIN_LEN: usize = 8;
/// Longest accepted tag after cleaning
pub const TAG_MAX_LEN: usize = 16;

/// Timestamp layout used in the scan log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name recorded for tags missing from the name database
pub const UNKNOWN_NAME: &str = "Unknown";

/// Strip everything that is not alphanumeric from raw reader output
pub fn clean_tag(raw: &str) -> String {
    raw.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// A tag is valid when it is entirely alphanumeric and 8..=16 chars long
pub fn is_valid_tag(candidate: &str) -> bool {
    let len = candidate.chars().count();
    (TAG_MIN_LEN..=TAG_MAX_LEN).contains(&len) && candidate.chars().all(char::is_alphanumeric)
}

/// Newtype wrapper for validated tag identifiers
///
/// Only constructible through [`Tag::parse`], so every `Tag` in the system
/// has passed cleaning and validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Clean raw input and validate it, returning `None` for rejected input
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = clean_tag(raw);
        is_valid_tag(&cleaned).then_some(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the reader is currently installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    School,
    #[serde(alias = "bus stop", alias = "bus_stop")]
    Bus,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::School, Location::Bus];

    /// Config and log name
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::School => "school",
            Location::Bus => "bus",
        }
    }

    /// Human-facing name shown on the location selector
    pub fn display_name(&self) -> &'static str {
        match self {
            Location::School => "School",
            Location::Bus => "Bus Stop",
        }
    }

    /// (enter, exit) labels written to the log
    pub fn labels(&self) -> (&'static str, &'static str) {
        match self {
            Location::Bus => ("got on the bus", "got off the bus"),
            Location::School => ("entered the school building", "left the school building"),
        }
    }

    pub fn label(&self, direction: Direction) -> &'static str {
        let (enter, exit) = self.labels();
        match direction {
            Direction::Enter => enter,
            Direction::Exit => exit,
        }
    }

    /// Map a logged direction label back to the location and direction that produced it
    pub fn from_label(label: &str) -> Option<(Location, Direction)> {
        let label = label.trim();
        Self::ALL.iter().find_map(|&location| {
            let (enter, exit) = location.labels();
            if label == enter {
                Some((location, Direction::Enter))
            } else if label == exit {
                Some((location, Direction::Exit))
            } else {
                None
            }
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "school" => Ok(Location::School),
            "bus" | "bus stop" | "bus_stop" => Ok(Location::Bus),
            other => Err(format!("unknown location '{}' (expected 'school' or 'bus')", other)),
        }
    }
}

/// Direction of a scan relative to the current location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Enter,
    Exit,
}

/// A processed scan, ready to be appended to the log
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub timestamp: NaiveDateTime,
    pub tag: Tag,
    pub name: String,
    pub location: Location,
    pub direction: Direction,
}

impl ScanEvent {
    pub fn direction_label(&self) -> &'static str {
        self.location.label(self.direction)
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Log row in column order: timestamp, tag, name, direction
    pub fn to_row(&self) -> LogRow<'_> {
        LogRow {
            timestamp: self.formatted_timestamp(),
            tag: &self.tag,
            name: &self.name,
            direction: self.direction_label(),
        }
    }
}

/// Serialized form of a [`ScanEvent`]; field order is the log's column order
#[derive(Debug, Serialize)]
pub struct LogRow<'a> {
    pub timestamp: String,
    pub tag: &'a Tag,
    pub name: &'a str,
    pub direction: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_clean_tag_strips_separators() {
        assert_eq!(clean_tag("AB-12-CD-34"), "AB12CD34");
        assert_eq!(clean_tag("  A1B2C3D4\r\n"), "A1B2C3D4");
        assert_eq!(clean_tag("\x02"), "");
    }

    #[test]
    fn test_is_valid_tag_bounds() {
        assert!(is_valid_tag("A1B2C3D4"));
        assert!(!is_valid_tag("A1B2C3"));
        assert!(is_valid_tag("0123456789ABCDEF"));
        assert!(!is_valid_tag("0123456789ABCDEF0"));
        assert!(!is_valid_tag("A1B2-C3D4"));
        assert!(!is_valid_tag(""));
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!(Tag::parse("AB-12-CD-34").unwrap().as_str(), "AB12CD34");
        assert!(Tag::parse("bad").is_none());
        assert!(Tag::parse("").is_none());
    }

    #[test]
    fn test_location_labels() {
        assert_eq!(Location::Bus.label(Direction::Enter), "got on the bus");
        assert_eq!(Location::Bus.label(Direction::Exit), "got off the bus");
        assert_eq!(Location::School.label(Direction::Enter), "entered the school building");
        assert_eq!(Location::School.label(Direction::Exit), "left the school building");
    }

    #[test]
    fn test_location_from_label() {
        assert_eq!(
            Location::from_label("got off the bus"),
            Some((Location::Bus, Direction::Exit))
        );
        assert_eq!(
            Location::from_label("entered the school building"),
            Some((Location::School, Direction::Enter))
        );
        assert_eq!(Location::from_label("teleported"), None);
    }

    #[test]
    fn test_location_from_str() {
        assert_eq!("school".parse::<Location>().unwrap(), Location::School);
        assert_eq!("Bus".parse::<Location>().unwrap(), Location::Bus);
        assert_eq!("bus stop".parse::<Location>().unwrap(), Location::Bus);
        assert!("library".parse::<Location>().is_err());
    }

    #[derive(Debug, Deserialize)]
    struct LocationField {
        initial: Location,
    }

    #[test]
    fn test_location_deserialize_accepts_bus_stop_aliases() {
        for name in ["bus", "bus stop", "bus_stop"] {
            let field: LocationField = toml::from_str(&format!("initial = \"{}\"", name)).unwrap();
            assert_eq!(field.initial, Location::Bus);
        }
        assert!(toml::from_str::<LocationField>("initial = \"Bus\"").is_err());
    }

    #[test]
    fn test_scan_event_record() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(7, 45, 3)
            .unwrap();
        let event = ScanEvent {
            timestamp,
            tag: Tag::parse("A1B2C3D4").unwrap(),
            name: "Ada".to_string(),
            location: Location::Bus,
            direction: Direction::Enter,
        };

        let row = event.to_row();
        assert_eq!(row.timestamp, "2024-05-01 07:45:03");
        assert_eq!(row.tag.as_str(), "A1B2C3D4");
        assert_eq!(row.name, "Ada");
        assert_eq!(row.direction, "got on the bus");
    }
}
