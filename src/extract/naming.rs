// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Output folder and file naming.
//!
//! Names are a pure function of the topic, the naming scheme and the
//! per-topic index or the relevant timestamp, so re-running an extraction
//! into an empty directory reproduces the same names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{ExtractError, Result, NANOS_PER_SEC};
use crate::encoding::Time;

/// Digits of the zero-padded sequential index.
pub const DEFAULT_INDEX_PADDING: usize = 6;

/// How image file stems are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    /// Zero-padded per-topic index
    #[default]
    Sequential,
    /// Bag record timestamp in nanoseconds
    RosbagTimestamp,
    /// Header stamp, seconds and nanoseconds digits concatenated
    MsgTimestamp,
}

impl NamingScheme {
    /// Name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            NamingScheme::Sequential => "sequential",
            NamingScheme::RosbagTimestamp => "rosbag_timestamp",
            NamingScheme::MsgTimestamp => "msg_timestamp",
        }
    }

    /// File stem for one frame.
    pub fn stem(self, index: u64, rosbag_ns: u64, msg_timestamp: u64) -> String {
        match self {
            NamingScheme::Sequential => sequential_name(index, DEFAULT_INDEX_PADDING),
            NamingScheme::RosbagTimestamp => rosbag_ns.to_string(),
            NamingScheme::MsgTimestamp => msg_timestamp.to_string(),
        }
    }
}

impl fmt::Display for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingScheme {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(NamingScheme::Sequential),
            "rosbag_timestamp" => Ok(NamingScheme::RosbagTimestamp),
            "msg_timestamp" => Ok(NamingScheme::MsgTimestamp),
            other => Err(ExtractError::validation(
                "naming",
                format!("expected sequential, rosbag_timestamp or msg_timestamp, got '{other}'"),
            )),
        }
    }
}

/// Zero-padded decimal index.
pub fn sequential_name(index: u64, padding: usize) -> String {
    format!("{index:0padding$}")
}

/// Header stamp as the concatenation of its decimal fields.
///
/// `sec = 1_600_000_000, nsec = 5` gives `16000000005`, not the
/// nanosecond total. Existing datasets are keyed this way.
///
/// A stamp with `nsec >= 1e9` is malformed and gives a `DecodeError`.
pub fn msg_timestamp(stamp: Time) -> Result<u64> {
    if u64::from(stamp.nsec) >= NANOS_PER_SEC {
        return Err(ExtractError::decode(
            "header stamp",
            format!("nsec {} out of range", stamp.nsec),
        ));
    }
    // 10 + 9 digits at most, below u64::MAX
    format!("{}{}", stamp.sec, stamp.nsec)
        .parse()
        .map_err(|e| ExtractError::decode("header stamp", format!("{e}")))
}

/// Folder name for a topic: `/` becomes `_`, leading `_` stripped.
pub fn topic_folder_name(topic: &str) -> String {
    topic.replace('/', "_").trim_start_matches('_').to_string()
}

/// Full image file name: `{folder}_{stem}.{extension}`.
pub fn image_file_name(topic: &str, stem: &str, extension: &str) -> String {
    format!("{}_{stem}.{extension}", topic_folder_name(topic))
}
