// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag metadata summaries.
//!
//! A [`BagSummary`] is the JSON-ready description of one bag: time span,
//! size and per-topic message counts and frequencies.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::core::{Result, NANOS_PER_SEC};
use crate::io::detection::{ensure_bag_file, resolve_inputs};
use crate::io::formats::bag::BagReader;
use crate::io::metadata::TopicInfo;

/// Default file name of a combined summary.
pub const DEFAULT_SUMMARY_FILE_NAME: &str = "rosbag_metadata.json";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Summary of one bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagSummary {
    /// File name without directories
    pub file_name: String,
    /// First record time, seconds since the epoch
    pub start_time: f64,
    /// Last record time, seconds since the epoch
    pub end_time: f64,
    /// `end_time - start_time` in seconds
    pub duration: f64,
    /// File size in MiB
    pub file_size_mb: f64,
    /// One entry per topic, sorted by topic name
    pub topics: Vec<TopicInfo>,
}

impl BagSummary {
    /// Look up a topic.
    pub fn topic(&self, name: &str) -> Option<&TopicInfo> {
        self.topics.iter().find(|t| t.topic == name)
    }
}

/// Summarize one bag.
///
/// `NotFound` for paths that are not bags; parse failures are returned as
/// `CorruptContainer`.
pub fn summarize_bag(path: &Path) -> Result<BagSummary> {
    let reader = BagReader::open(path)?;
    let topics = reader.topic_infos()?.into_values().collect();

    let start_time = reader.start_time() as f64 / NANOS_PER_SEC as f64;
    let end_time = reader.end_time() as f64 / NANOS_PER_SEC as f64;

    Ok(BagSummary {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        start_time,
        end_time,
        duration: end_time - start_time,
        file_size_mb: reader.info().size as f64 / BYTES_PER_MB,
        topics,
    })
}

/// Summarize a bag, or every bag below a directory.
///
/// Keys are absolute bag paths. Bags that cannot be parsed map to `None`
/// so one broken file does not hide the others.
pub fn summarize_path(input: &Path) -> Result<BTreeMap<PathBuf, Option<BagSummary>>> {
    let mut summaries = BTreeMap::new();
    for bag in resolve_inputs(input)? {
        let key = fs::canonicalize(&bag).unwrap_or_else(|_| bag.clone());
        let summary = match summarize_bag(&bag) {
            Ok(summary) => Some(summary),
            Err(e) if e.is_corrupt_container() => {
                error!(bag = %bag.display(), error = %e, "Couldn't open bag, skipping");
                None
            }
            Err(e) => return Err(e),
        };
        summaries.insert(key, summary);
    }
    Ok(summaries)
}

/// Union of the topics of several bags, sorted.
///
/// Bags that cannot be opened contribute nothing.
pub fn all_topics<P: AsRef<Path>>(bags: &[P]) -> Result<Vec<String>> {
    let mut topics = BTreeSet::new();
    for bag in bags {
        let bag = bag.as_ref();
        ensure_bag_file(bag)?;
        match BagReader::open(bag) {
            Ok(reader) => {
                topics.extend(reader.connections().iter().map(|c| c.topic.clone()));
            }
            Err(e) => warn!(bag = %bag.display(), error = %e, "Skipping bag"),
        }
    }
    Ok(topics.into_iter().collect())
}

/// Where a per-bag summary file goes in split mode.
///
/// The file is `{bag file name}.json`, dot-prefixed when `hidden`. Without
/// `output` it lands next to the bag. With `output` the bag's directory
/// relative to `input_root` is mirrored below `output`.
pub fn split_summary_path(
    bag: &Path,
    input_root: &Path,
    output: Option<&Path>,
    hidden: bool,
) -> PathBuf {
    let file_name = bag
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = if hidden {
        format!(".{file_name}.json")
    } else {
        format!("{file_name}.json")
    };

    let bag_dir = bag.parent().unwrap_or_else(|| Path::new(""));
    match output {
        None => bag_dir.join(file_name),
        Some(output) => {
            let relative = bag_dir.strip_prefix(input_root).unwrap_or(Path::new(""));
            output.join(relative).join(file_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_next_to_bag() {
        let path = split_summary_path(
            Path::new("/data/run1/a.bag"),
            Path::new("/data"),
            None,
            false,
        );
        assert_eq!(path, PathBuf::from("/data/run1/a.bag.json"));
    }

    #[test]
    fn test_split_path_mirrors_structure() {
        let path = split_summary_path(
            Path::new("/data/run1/a.bag"),
            Path::new("/data"),
            Some(Path::new("/out")),
            true,
        );
        assert_eq!(path, PathBuf::from("/out/run1/.a.bag.json"));
    }

    #[test]
    fn test_split_path_single_file_input() {
        let path = split_summary_path(
            Path::new("/data/a.bag"),
            Path::new("/data/a.bag"),
            Some(Path::new("/out")),
            false,
        );
        assert_eq!(path, PathBuf::from("/out/a.bag.json"));
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = BagSummary {
            file_name: "a.bag".to_string(),
            start_time: 1.0,
            end_time: 3.5,
            duration: 2.5,
            file_size_mb: 0.5,
            topics: vec![TopicInfo::new("/cam", "sensor_msgs/Image", 4)],
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["duration"], 2.5);
        assert_eq!(value["topics"][0]["message_count"], 4);
        assert!(summary.topic("/cam").is_some());
        assert!(summary.topic("/imu").is_none());
    }
}
