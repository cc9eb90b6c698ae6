// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag clipping.
//!
//! Copies the records of selected topics inside a time window into a new
//! bag. Payloads are copied byte for byte; connections keep their md5sum,
//! definition and caller ID.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{ExtractError, Result};
use crate::extract::window::{convert_offset_to_absolute, is_within_and_past_end};
use crate::io::filter::TopicFilter;
use crate::io::formats::bag::{BagMessage, BagReader, BagWriter, Compression};

/// How clip bounds are expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampKind {
    /// Absolute bag time in nanoseconds
    #[default]
    RosbagNs,
    /// Seconds relative to the first record
    OffsetS,
}

impl TimestampKind {
    /// Name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            TimestampKind::RosbagNs => "rosbag_ns",
            TimestampKind::OffsetS => "offset_s",
        }
    }

    /// Parse textual bounds into a window of this kind.
    pub fn window(self, start: Option<&str>, end: Option<&str>) -> Result<ClipWindow> {
        match self {
            TimestampKind::RosbagNs => {
                let parse = |field: &str, v: &str| {
                    v.trim().parse::<u64>().map_err(|_| {
                        ExtractError::validation(field, format!("'{v}' is not a nanosecond time"))
                    })
                };
                Ok(ClipWindow::RosbagNs {
                    start: start.map(|v| parse("start", v)).transpose()?,
                    end: end.map(|v| parse("end", v)).transpose()?,
                })
            }
            TimestampKind::OffsetS => {
                let parse = |field: &str, v: &str| {
                    v.trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|s| s.is_finite())
                        .ok_or_else(|| {
                            ExtractError::validation(field, format!("'{v}' is not an offset in seconds"))
                        })
                };
                Ok(ClipWindow::OffsetS {
                    start: start.map(|v| parse("start", v)).transpose()?,
                    end: end.map(|v| parse("end", v)).transpose()?,
                })
            }
        }
    }
}

impl fmt::Display for TimestampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rosbag_ns" => Ok(TimestampKind::RosbagNs),
            "offset_s" => Ok(TimestampKind::OffsetS),
            other => Err(ExtractError::validation(
                "timestamp_kind",
                format!("expected rosbag_ns or offset_s, got '{other}'"),
            )),
        }
    }
}

/// Clip bounds, both inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ClipWindow {
    /// Keep every record
    #[default]
    Unbounded,
    /// Absolute bounds in nanoseconds
    RosbagNs {
        /// Earliest kept time
        start: Option<u64>,
        /// Latest kept time
        end: Option<u64>,
    },
    /// Bounds in seconds after the first record
    OffsetS {
        /// Earliest kept offset
        start: Option<f64>,
        /// Latest kept offset
        end: Option<f64>,
    },
}

impl ClipWindow {
    /// Absolute nanosecond bounds given the first record time.
    pub fn resolve(&self, first_ns: u64) -> (Option<u64>, Option<u64>) {
        match *self {
            ClipWindow::Unbounded => (None, None),
            ClipWindow::RosbagNs { start, end } => (start, end),
            ClipWindow::OffsetS { start, end } => (
                start.map(|s| convert_offset_to_absolute(s, first_ns)),
                end.map(|e| convert_offset_to_absolute(e, first_ns)),
            ),
        }
    }
}

/// Options of one clip.
#[derive(Debug, Clone, Default)]
pub struct ClipOptions {
    /// Topics to keep; empty keeps all
    pub topics: Vec<String>,
    /// Time bounds
    pub window: ClipWindow,
    /// Chunk compression of the output
    pub compression: Compression,
}

impl ClipOptions {
    /// Keep every record, uncompressed output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these topics.
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the time bounds.
    #[must_use]
    pub fn with_window(mut self, window: ClipWindow) -> Self {
        self.window = window;
        self
    }

    /// Set the output chunk compression.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Statistics from a clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipStats {
    /// Records read from the input
    pub messages_read: u64,
    /// Records written to the output
    pub messages_written: u64,
    /// Connections written to the output
    pub connection_count: u64,
    /// Whether reading stopped at a record past the end bound
    pub stopped_early: bool,
}

/// Copy a time and topic slice of `input` into a new bag at `output`.
///
/// Offsets are taken from the earliest record of the bag. Reading stops
/// at the first selected record past the end bound.
pub fn clip_bag(input: &Path, output: &Path, options: &ClipOptions) -> Result<ClipStats> {
    if input == output {
        return Err(ExtractError::validation(
            "output",
            "output bag must differ from the input bag",
        ));
    }

    let reader = BagReader::open(input)?;
    let (start_ns, end_ns) = options.window.resolve(reader.start_time());
    debug!(?start_ns, ?end_ns, "Resolved clip window");

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BagWriter::create(output)?.with_compression(options.compression);

    let filter = if options.topics.is_empty() {
        TopicFilter::All
    } else {
        TopicFilter::include(options.topics.iter().cloned())
    };

    let mut stats = ClipStats::default();
    let mut conn_mapping: HashMap<u32, u32> = HashMap::new();

    for item in reader.messages(&filter) {
        let (conn, record) = item?;
        stats.messages_read += 1;

        let (in_range, past_end) = is_within_and_past_end(record.time_ns, start_ns, end_ns);
        if past_end {
            stats.stopped_early = true;
            break;
        }
        if !in_range {
            continue;
        }

        let out_id = match conn_mapping.get(&conn.id) {
            Some(id) => *id,
            None => {
                let id = writer.add_connection_from(&conn)?;
                conn_mapping.insert(conn.id, id);
                id
            }
        };
        writer.write_message(&BagMessage::new(out_id, record.time_ns, record.data))?;
        stats.messages_written += 1;
    }

    stats.connection_count = writer.connection_count() as u64;
    writer.finish()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        written = stats.messages_written,
        read = stats.messages_read,
        "Clipped bag"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_kind_parse() {
        assert_eq!("offset_s".parse::<TimestampKind>().unwrap(), TimestampKind::OffsetS);
        assert_eq!("rosbag_ns".parse::<TimestampKind>().unwrap(), TimestampKind::RosbagNs);
        assert!(matches!(
            "seconds".parse::<TimestampKind>(),
            Err(ExtractError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_offset_window_resolves_from_first_record() {
        let window = TimestampKind::OffsetS.window(Some("1.5"), None).unwrap();
        assert_eq!(window.resolve(10_000_000_000), (Some(11_500_000_000), None));
    }

    #[test]
    fn test_ns_window_is_absolute() {
        let window = TimestampKind::RosbagNs
            .window(Some("1600000000000000001"), Some("1600000000000000009"))
            .unwrap();
        assert_eq!(
            window.resolve(42),
            (Some(1_600_000_000_000_000_001), Some(1_600_000_000_000_000_009))
        );
    }

    #[test]
    fn test_bad_bounds_rejected() {
        assert!(TimestampKind::RosbagNs.window(Some("1.5"), None).is_err());
        assert!(TimestampKind::OffsetS.window(None, Some("inf")).is_err());
    }

    #[test]
    fn test_unbounded_window() {
        assert_eq!(ClipWindow::Unbounded.resolve(5), (None, None));
    }
}
