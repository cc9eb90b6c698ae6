// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Sequential ROS1 bag reader.
//!
//! [`BagReader`] wraps a [`BagParser`] and exposes the bag as one ordered
//! stream of raw records. Records come out in file order: chunk by chunk,
//! and in record order within a chunk. Nothing is re-sorted by time.
//!
//! Chunks are decompressed one at a time and only when they contain at
//! least one selected connection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::vec;

use tracing::debug;

use super::parser::{parse_chunk_messages, BagParser, ChunkMessage};
use crate::core::{ExtractError, Result, NANOS_PER_SEC};
use crate::io::detection::ensure_bag_file;
use crate::io::filter::TopicFilter;
use crate::io::metadata::{BagInfo, Connection, RawRecord, TopicInfo};

/// Reader over one ROS1 bag file.
pub struct BagReader {
    parser: BagParser,
    connections: HashMap<u32, Arc<Connection>>,
    info: BagInfo,
}

impl BagReader {
    /// Open a bag file.
    ///
    /// Returns `NotFound` for paths that are not bag files and
    /// `CorruptContainer` when the record stream cannot be parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        ensure_bag_file(path)?;
        let parser = BagParser::open(path)?;

        let info = BagInfo {
            path: parser.path().to_string(),
            version: parser.header().version.clone(),
            size: parser.file_size(),
            connections: parser.connections().values().cloned().collect(),
            start_time: parser.start_time(),
            end_time: parser.end_time(),
        };
        let connections = parser
            .connections()
            .iter()
            .map(|(id, c)| (*id, Arc::new(c.clone())))
            .collect();

        debug!(
            path = %info.path,
            connections = info.connections.len(),
            chunks = parser.chunks().len(),
            "Opened bag"
        );

        Ok(Self {
            parser,
            connections,
            info,
        })
    }

    /// Bag-level information.
    pub fn info(&self) -> &BagInfo {
        &self.info
    }

    /// All connections, ordered by ID.
    pub fn connections(&self) -> &[Connection] {
        &self.info.connections
    }

    /// Earliest record timestamp (ns).
    pub fn start_time(&self) -> u64 {
        self.info.start_time
    }

    /// Latest record timestamp (ns).
    pub fn end_time(&self) -> u64 {
        self.info.end_time
    }

    /// Iterate over the records of connections selected by `filter`.
    pub fn messages(&self, filter: &TopicFilter) -> BagMessageIter<'_> {
        BagMessageIter {
            reader: self,
            allowed: filter.allowed_ids(&self.info.connections),
            next_chunk: 0,
            pending: Vec::new().into_iter(),
            failed: false,
        }
    }

    /// Per-topic summaries including publishing frequency.
    ///
    /// The frequency is the inverse of the median interval between
    /// consecutive records of the topic, taken from the index records.
    pub fn topic_infos(&self) -> Result<BTreeMap<String, TopicInfo>> {
        let mut table = self.info.topic_table();

        let mut times: HashMap<&str, Vec<u64>> = HashMap::new();
        for chunk in self.parser.chunks() {
            for entry in self.parser.chunk_index(chunk)? {
                if let Some(conn) = self.connections.get(&entry.conn_id) {
                    times.entry(conn.topic.as_str()).or_default().push(entry.time);
                }
            }
        }

        for (topic, mut stamps) in times {
            if let Some(info) = table.get_mut(topic) {
                stamps.sort_unstable();
                info.frequency = frequency_hz(&stamps);
            }
        }

        Ok(table)
    }
}

/// Inverse of the median interval between sorted timestamps.
pub(crate) fn frequency_hz(sorted_ns: &[u64]) -> Option<f64> {
    if sorted_ns.len() < 2 {
        return None;
    }
    let mut periods: Vec<u64> = sorted_ns.windows(2).map(|w| w[1] - w[0]).collect();
    periods.sort_unstable();
    let mid = periods.len() / 2;
    let median = if periods.len() % 2 == 0 {
        (periods[mid - 1] + periods[mid]) as f64 / 2.0
    } else {
        periods[mid] as f64
    };
    if median > 0.0 {
        Some(NANOS_PER_SEC as f64 / median)
    } else {
        None
    }
}

/// Lazy iterator over `(connection, record)` pairs of a bag.
///
/// A chunk that fails to decompress yields one error and ends iteration.
pub struct BagMessageIter<'a> {
    reader: &'a BagReader,
    allowed: HashSet<u32>,
    next_chunk: usize,
    pending: vec::IntoIter<ChunkMessage>,
    failed: bool,
}

impl BagMessageIter<'_> {
    fn load_next_chunk(&mut self) -> Option<Result<()>> {
        let reader = self.reader;
        let chunks = reader.parser.chunks();
        while self.next_chunk < chunks.len() {
            let chunk = &chunks[self.next_chunk];
            self.next_chunk += 1;

            let relevant = chunk
                .connection_counts
                .iter()
                .any(|(id, _)| self.allowed.contains(id));
            if !relevant {
                continue;
            }

            let path = reader.parser.path();
            let allowed = &self.allowed;
            let loaded = reader.parser.read_chunk(chunk).and_then(|data| {
                parse_chunk_messages(&data, |id| allowed.contains(&id))
                    .map_err(|e| ExtractError::corrupt(path, e.to_string()))
            });
            return Some(loaded.map(|messages| {
                self.pending = messages.into_iter();
            }));
        }
        None
    }
}

impl Iterator for BagMessageIter<'_> {
    type Item = Result<(Arc<Connection>, RawRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(msg) = self.pending.next() {
                let Some(conn) = self.reader.connections.get(&msg.conn_id) else {
                    continue;
                };
                let record = RawRecord::new(conn.topic.clone(), msg.time, msg.data);
                return Some(Ok((Arc::clone(conn), record)));
            }

            match self.load_next_chunk()? {
                Ok(()) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
