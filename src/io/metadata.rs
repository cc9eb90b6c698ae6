// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Metadata types for ROS1 bag files.
//!
//! Connections and bag-level information are produced once when a bag is
//! opened; raw records are produced one at a time while iterating.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::NANOS_PER_SEC;

/// A ROS1 connection: one topic bound to one message type.
///
/// Several connections may share a topic (different publishers).
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Connection ID within the bag
    pub id: u32,
    /// Topic name (e.g., "/camera/image_raw")
    pub topic: String,
    /// Message type name (e.g., "sensor_msgs/Image")
    pub message_type: String,
    /// MD5 sum of the message definition
    pub md5sum: String,
    /// Full message definition text
    pub message_definition: String,
    /// Publishing node, empty if not recorded
    pub callerid: String,
    /// Number of messages recorded on this connection (0 if unknown)
    pub message_count: u64,
}

impl Connection {
    /// Create a new Connection.
    pub fn new(id: u32, topic: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            id,
            topic: topic.into(),
            message_type: message_type.into(),
            md5sum: String::new(),
            message_definition: String::new(),
            callerid: String::new(),
            message_count: 0,
        }
    }

    /// Set the message count.
    pub fn with_message_count(mut self, count: u64) -> Self {
        self.message_count = count;
        self
    }

    /// Set the message definition.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.message_definition = definition.into();
        self
    }
}

/// One undecoded message record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Topic the record was published on
    pub topic: String,
    /// Record timestamp (nanoseconds since Unix epoch)
    pub time_ns: u64,
    /// ROS1 serialized message bytes
    pub data: Vec<u8>,
}

impl RawRecord {
    /// Create a new RawRecord.
    pub fn new(topic: impl Into<String>, time_ns: u64, data: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            time_ns,
            data,
        }
    }

    /// Seconds since `start_ns`, zero for earlier records.
    ///
    /// The difference is taken in integer nanoseconds so offsets keep full
    /// precision at epoch-scale timestamps.
    pub fn elapsed_secs(&self, start_ns: u64) -> f64 {
        self.time_ns.saturating_sub(start_ns) as f64 / NANOS_PER_SEC as f64
    }
}

/// Per-topic summary, aggregated over every connection of the topic.
///
/// This is the `"topic"` object written into image manifests and bag
/// summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Topic name
    pub topic: String,
    /// Message type name
    pub message_type: String,
    /// Total messages on the topic
    pub message_count: u64,
    /// Publishing frequency in Hz, `None` with fewer than two messages
    pub frequency: Option<f64>,
}

impl TopicInfo {
    /// Create a TopicInfo with unknown frequency.
    pub fn new(topic: impl Into<String>, message_type: impl Into<String>, count: u64) -> Self {
        Self {
            topic: topic.into(),
            message_type: message_type.into(),
            message_count: count,
            frequency: None,
        }
    }
}

/// Information about an opened bag file.
#[derive(Debug, Clone)]
pub struct BagInfo {
    /// File path
    pub path: String,
    /// Bag format version (e.g., "2.0")
    pub version: String,
    /// File size in bytes
    pub size: u64,
    /// All connections, ordered by ID
    pub connections: Vec<Connection>,
    /// Earliest record timestamp (nanoseconds, 0 if unknown)
    pub start_time: u64,
    /// Latest record timestamp (nanoseconds, 0 if unknown)
    pub end_time: u64,
}

impl BagInfo {
    /// Duration in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Total message count over all connections.
    pub fn message_count(&self) -> u64 {
        self.connections.iter().map(|c| c.message_count).sum()
    }

    /// Check if the bag has a specific topic.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.connections.iter().any(|c| c.topic == topic)
    }

    /// Get the number of distinct topics.
    pub fn topic_count(&self) -> usize {
        self.connections
            .iter()
            .map(|c| c.topic.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Aggregate connections into one [`TopicInfo`] per topic.
    ///
    /// Frequencies are left unset; see
    /// [`BagReader::topic_infos`](crate::io::formats::bag::BagReader::topic_infos).
    pub fn topic_table(&self) -> BTreeMap<String, TopicInfo> {
        let mut table: BTreeMap<String, TopicInfo> = BTreeMap::new();
        for conn in &self.connections {
            table
                .entry(conn.topic.clone())
                .and_modify(|t| t.message_count += conn.message_count)
                .or_insert_with(|| {
                    TopicInfo::new(&conn.topic, &conn.message_type, conn.message_count)
                });
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> BagInfo {
        BagInfo {
            path: "test.bag".to_string(),
            version: "2.0".to_string(),
            size: 1000,
            connections: vec![
                Connection::new(0, "/cam0", "sensor_msgs/Image").with_message_count(10),
                Connection::new(1, "/cam0", "sensor_msgs/Image").with_message_count(5),
                Connection::new(2, "/imu", "sensor_msgs/Imu").with_message_count(100),
            ],
            start_time: 2 * NANOS_PER_SEC,
            end_time: 7 * NANOS_PER_SEC,
        }
    }

    #[test]
    fn test_bag_info_aggregates() {
        let info = info();
        assert_eq!(info.duration(), 5 * NANOS_PER_SEC);
        assert_eq!(info.message_count(), 115);
        assert_eq!(info.topic_count(), 2);
        assert!(info.has_topic("/imu"));
        assert!(!info.has_topic("/lidar"));
    }

    #[test]
    fn test_topic_table_merges_connections() {
        let table = info().topic_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table["/cam0"].message_count, 15);
        assert_eq!(table["/imu"].message_type, "sensor_msgs/Imu");
        assert_eq!(table["/imu"].frequency, None);
    }

    #[test]
    fn test_raw_record_elapsed() {
        let start = 1_600_000_000_123_456_789;
        let rec = RawRecord::new("/cam0", start + 700_000_000, vec![1, 2]);
        assert_eq!(rec.elapsed_secs(start), 0.7);
        assert_eq!(rec.elapsed_secs(start + 1_000_000_000), 0.0);
    }

    #[test]
    fn test_topic_info_serializes_null_frequency() {
        let json = serde_json::to_string(&TopicInfo::new("/a", "sensor_msgs/Image", 3)).unwrap();
        assert_eq!(
            json,
            r#"{"topic":"/a","message_type":"sensor_msgs/Image","message_count":3,"frequency":null}"#
        );
    }
}
