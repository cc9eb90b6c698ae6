// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag file writer.
//!
//! Used by the clip command to copy a window of records into a new bag,
//! and by the test suites to synthesize recordings.
//!
//! # ROS1 Bag Format Overview
//!
//! A ROS1 bag file has the following structure:
//! 1. Version line: `#ROSBAG V2.0\n`
//! 2. File header record (4096 bytes, padded)
//! 3. Chunks containing:
//!    - Connection records (metadata for each topic)
//!    - Message data records
//!
//!    each chunk followed by one index data record per connection
//! 4. Connection records (summary at end)
//! 5. Chunk info records (summary at end)
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagframes::io::formats::bag::{BagMessage, BagWriter, Compression};
//!
//! let mut writer = BagWriter::create("output.bag")?.with_compression(Compression::Lz4);
//! let conn = writer.add_connection("/camera/image", "sensor_msgs/Image", "")?;
//! writer.write_message(&BagMessage::new(conn, 1_234_567_890, vec![0u8; 10]))?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use super::parser::{
    OP_BAG_HEADER, OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA, OP_MSG_DATA,
    SUPPORTED_VERSION,
};
use crate::core::{ExtractError, Result, NANOS_PER_SEC};
use crate::io::metadata::Connection;

/// Index data version
const INDEX_VERSION: u32 = 1;

/// Chunk info version
const CHUNK_INFO_VERSION: u32 = 1;

/// Default chunk threshold (768KB)
const DEFAULT_CHUNK_THRESHOLD: usize = 768 * 1024;

/// MD5 written when a connection carries none.
const ZERO_MD5: &str = "00000000000000000000000000000000";

/// Chunk compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Store chunks uncompressed
    #[default]
    None,
    /// bzip2
    Bz2,
    /// LZ4 frame format
    Lz4,
}

impl Compression {
    /// Name as written in the chunk header.
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bz2 => "bz2",
            Compression::Lz4 => "lz4",
        }
    }

    fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Bz2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compression::Lz4 => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
                encoder.write_all(data)?;
                encoder
                    .finish()
                    .map_err(|e| ExtractError::io("BagWriter", format!("LZ4 compression failed: {e}")))
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "bz2" => Ok(Compression::Bz2),
            "lz4" => Ok(Compression::Lz4),
            other => Err(ExtractError::validation(
                "compression",
                format!("expected none, bz2 or lz4, got '{other}'"),
            )),
        }
    }
}

/// A message to be written to a bag file.
#[derive(Debug, Clone)]
pub struct BagMessage {
    /// Connection ID returned by `add_connection`
    pub conn_id: u32,
    /// Timestamp in nanoseconds since Unix epoch
    pub time_ns: u64,
    /// Raw message data (ROS1 serialized bytes)
    pub data: Vec<u8>,
}

impl BagMessage {
    /// Create a new BagMessage.
    pub fn new(conn_id: u32, time_ns: u64, data: Vec<u8>) -> Self {
        Self {
            conn_id,
            time_ns,
            data,
        }
    }
}

/// Index entry for message lookup
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    /// Timestamp (sec, nsec)
    time: (u32, u32),
    /// Offset within the uncompressed chunk
    offset: u32,
}

/// Chunk info for the bag summary
#[derive(Debug, Clone)]
struct ChunkInfo {
    /// Position of the chunk record in the file
    pos: u64,
    /// Start time (sec, nsec)
    start_time: (u32, u32),
    /// End time (sec, nsec)
    end_time: (u32, u32),
    /// Message count per connection ID
    connection_counts: BTreeMap<u32, u32>,
}

/// ROS1 bag file writer.
///
/// # Important
///
/// You must call [`finish()`](BagWriter::finish) to finalize the bag file.
/// A writer dropped without `finish()` leaves a bag without index section
/// and logs a warning.
pub struct BagWriter {
    writer: BufWriter<File>,
    path: String,
    is_open: bool,
    compression: Compression,
    chunk_threshold: usize,

    /// All connections, indexed by ID
    connections: Vec<Connection>,
    /// All chunk infos
    chunk_infos: Vec<ChunkInfo>,

    /// Uncompressed records of the open chunk
    chunk_data: Vec<u8>,
    /// Open chunk info
    current_chunk: Option<ChunkInfo>,
    /// Index entries of the open chunk per connection
    chunk_indexes: HashMap<u32, Vec<IndexEntry>>,
    /// Connections written to the open chunk
    connections_in_chunk: HashSet<u32>,

    /// Total bytes written to file
    file_pos: u64,
}

impl BagWriter {
    /// Create a new bag file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let file = File::create(&path).map_err(|e| {
            ExtractError::io("BagWriter", format!("Failed to create {path_str}: {e}"))
        })?;

        let mut writer = BufWriter::new(file);

        let mut start_buffer = Vec::new();
        write_file_header_record(&mut start_buffer, 0, 0, 0);
        writer.write_all(&start_buffer)?;

        Ok(Self {
            writer,
            path: path_str,
            is_open: true,
            compression: Compression::None,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            connections: Vec::new(),
            chunk_infos: Vec::new(),
            chunk_data: Vec::new(),
            current_chunk: None,
            chunk_indexes: HashMap::new(),
            connections_in_chunk: HashSet::new(),
            file_pos: start_buffer.len() as u64,
        })
    }

    /// Set the chunk compression.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the uncompressed size at which a chunk is flushed.
    #[must_use]
    pub fn with_chunk_threshold(mut self, bytes: usize) -> Self {
        self.chunk_threshold = bytes.max(1);
        self
    }

    /// Output path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add a connection and return its ID.
    ///
    /// IDs are assigned sequentially from 0.
    pub fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        message_definition: &str,
    ) -> Result<u32> {
        let conn = Connection::new(0, topic, message_type).with_definition(message_definition);
        self.add_connection_from(&conn)
    }

    /// Add a connection copying md5sum, definition and caller ID from
    /// an existing one. The source ID is not kept.
    pub fn add_connection_from(&mut self, source: &Connection) -> Result<u32> {
        if !self.is_open {
            return Err(ExtractError::io(
                "BagWriter",
                "Cannot add connection to closed bag",
            ));
        }

        let id = self.connections.len() as u32;
        let mut conn = source.clone();
        conn.id = id;
        conn.message_count = 0;
        if conn.md5sum.is_empty() {
            conn.md5sum = ZERO_MD5.to_string();
        }
        self.connections.push(conn);
        Ok(id)
    }

    /// Number of connections added so far.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of messages written so far.
    pub fn message_count(&self) -> u64 {
        self.chunk_infos
            .iter()
            .chain(self.current_chunk.as_ref())
            .map(|c| c.connection_counts.values().map(|&v| v as u64).sum::<u64>())
            .sum()
    }

    /// Write a message to the bag file.
    pub fn write_message(&mut self, msg: &BagMessage) -> Result<()> {
        if !self.is_open {
            return Err(ExtractError::io("BagWriter", "Cannot write to closed bag"));
        }
        if msg.conn_id as usize >= self.connections.len() {
            return Err(ExtractError::io(
                "BagWriter",
                format!(
                    "No connection found for conn_id {} (only {} connections added)",
                    msg.conn_id,
                    self.connections.len()
                ),
            ));
        }

        let conn_id = msg.conn_id;
        let time = ns_to_time(msg.time_ns);

        let chunk = self.current_chunk.get_or_insert_with(|| ChunkInfo {
            pos: 0,
            start_time: time,
            end_time: time,
            connection_counts: BTreeMap::new(),
        });
        if time_less_than(time, chunk.start_time) {
            chunk.start_time = time;
        }
        if time_less_than(chunk.end_time, time) {
            chunk.end_time = time;
        }
        *chunk.connection_counts.entry(conn_id).or_default() += 1;

        if self.connections_in_chunk.insert(conn_id) {
            write_connection_record(&mut self.chunk_data, &self.connections[conn_id as usize]);
        }

        let offset = self.chunk_data.len() as u32;

        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_MSG_DATA]);
        fields.insert("conn", u32_to_bytes(conn_id));
        fields.insert("time", time_to_bytes(time));
        write_header(&mut self.chunk_data, &fields);
        write_u32(&mut self.chunk_data, msg.data.len() as u32);
        self.chunk_data.extend_from_slice(&msg.data);

        self.chunk_indexes
            .entry(conn_id)
            .or_default()
            .push(IndexEntry { time, offset });

        if self.chunk_data.len() >= self.chunk_threshold {
            self.finish_chunk()?;
        }

        Ok(())
    }

    /// Compress the open chunk and write it, followed by its index records.
    fn finish_chunk(&mut self) -> Result<()> {
        let Some(mut chunk_info) = self.current_chunk.take() else {
            return Ok(());
        };

        let compressed = self.compression.compress(&self.chunk_data)?;

        let mut buffer = Vec::with_capacity(compressed.len() + 256);
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_CHUNK]);
        fields.insert("compression", self.compression.as_str().as_bytes().to_vec());
        fields.insert("size", u32_to_bytes(self.chunk_data.len() as u32));
        write_header(&mut buffer, &fields);
        write_u32(&mut buffer, compressed.len() as u32);
        buffer.extend_from_slice(&compressed);

        write_index_records(&mut buffer, &self.chunk_indexes);

        self.writer
            .write_all(&buffer)
            .map_err(|e| ExtractError::io("BagWriter", format!("Failed to write chunk: {e}")))?;

        chunk_info.pos = self.file_pos;
        self.file_pos += buffer.len() as u64;
        self.chunk_infos.push(chunk_info);

        self.chunk_data.clear();
        self.chunk_indexes.clear();
        self.connections_in_chunk.clear();

        Ok(())
    }

    /// Finalize the bag file and write the index section.
    pub fn finish(mut self) -> Result<()> {
        self.finish_internal()
    }

    fn finish_internal(&mut self) -> Result<()> {
        if !self.is_open {
            return Err(ExtractError::io("BagWriter", "Bag already closed"));
        }

        self.finish_chunk()?;

        let index_pos = self.file_pos;

        let mut stop_buffer = Vec::new();
        for conn in &self.connections {
            write_connection_record(&mut stop_buffer, conn);
        }
        write_chunk_info_records(&mut stop_buffer, &self.chunk_infos);
        self.writer
            .write_all(&stop_buffer)
            .map_err(|e| ExtractError::io("BagWriter", format!("Failed to write index: {e}")))?;

        let mut header_buffer = Vec::new();
        write_file_header_record(
            &mut header_buffer,
            self.connections.len() as u32,
            self.chunk_infos.len() as u32,
            index_pos,
        );
        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&header_buffer)?;
        self.writer.flush()?;

        self.is_open = false;
        Ok(())
    }
}

impl Drop for BagWriter {
    fn drop(&mut self) {
        if self.is_open {
            warn!(path = %self.path, "BagWriter dropped without calling finish()");
        }
    }
}

/// Write a header as key=value pairs, returning its length.
fn write_header(buffer: &mut Vec<u8>, fields: &BTreeMap<&str, Vec<u8>>) -> u32 {
    let mut header_data = Vec::new();

    for (key, value) in fields {
        let field_len = key.len() + 1 + value.len();
        write_u32(&mut header_data, field_len as u32);
        header_data.extend_from_slice(key.as_bytes());
        header_data.push(b'=');
        header_data.extend_from_slice(value);
    }

    let header_len = header_data.len() as u32;
    write_u32(buffer, header_len);
    buffer.extend(header_data);

    header_len
}

/// Write version line and file header record, padded to 4096 bytes.
fn write_file_header_record(
    buffer: &mut Vec<u8>,
    connection_count: u32,
    chunk_count: u32,
    index_pos: u64,
) {
    buffer.extend_from_slice(format!("#ROSBAG V{SUPPORTED_VERSION}\n").as_bytes());
    let version_len = buffer.len();

    let mut fields = BTreeMap::new();
    fields.insert("op", vec![OP_BAG_HEADER]);
    fields.insert("index_pos", index_pos.to_le_bytes().to_vec());
    fields.insert("conn_count", u32_to_bytes(connection_count));
    fields.insert("chunk_count", u32_to_bytes(chunk_count));

    let header_len = write_header(buffer, &fields);

    // 4096 - version_len - 4 (header_len) - header_len - 4 (data_len) = data_len
    let used = version_len + 4 + header_len as usize;
    let data_len = 4096 - used - 4;

    write_u32(buffer, data_len as u32);
    buffer.resize(buffer.len() + data_len, b' ');
}

/// Write a connection record.
fn write_connection_record(buffer: &mut Vec<u8>, conn: &Connection) {
    let mut fields = BTreeMap::new();
    fields.insert("op", vec![OP_CONNECTION]);
    fields.insert("conn", u32_to_bytes(conn.id));
    fields.insert("topic", conn.topic.as_bytes().to_vec());
    write_header(buffer, &fields);

    // Data section is a second field list
    let mut data_fields = BTreeMap::new();
    data_fields.insert("topic", conn.topic.as_bytes().to_vec());
    data_fields.insert("type", conn.message_type.as_bytes().to_vec());
    data_fields.insert("md5sum", conn.md5sum.as_bytes().to_vec());
    data_fields.insert(
        "message_definition",
        conn.message_definition.as_bytes().to_vec(),
    );
    if !conn.callerid.is_empty() {
        let callerid = if conn.callerid.starts_with('/') {
            conn.callerid.clone()
        } else {
            format!("/{}", conn.callerid)
        };
        data_fields.insert("callerid", callerid.into_bytes());
    }
    // Required by rosbag readers
    data_fields.insert("latching", b"0".to_vec());

    write_header(buffer, &data_fields);
}

/// Write one index data record per connection of a chunk.
fn write_index_records(buffer: &mut Vec<u8>, indexes: &HashMap<u32, Vec<IndexEntry>>) {
    let mut ids: Vec<_> = indexes.keys().copied().collect();
    ids.sort_unstable();

    for conn_id in ids {
        let entries = &indexes[&conn_id];
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_INDEX_DATA]);
        fields.insert("conn", u32_to_bytes(conn_id));
        fields.insert("ver", u32_to_bytes(INDEX_VERSION));
        fields.insert("count", u32_to_bytes(entries.len() as u32));
        write_header(buffer, &fields);

        // 8 bytes time + 4 bytes offset
        write_u32(buffer, (entries.len() * 12) as u32);
        for entry in entries {
            write_u32(buffer, entry.time.0);
            write_u32(buffer, entry.time.1);
            write_u32(buffer, entry.offset);
        }
    }
}

/// Write chunk info records.
fn write_chunk_info_records(buffer: &mut Vec<u8>, chunk_infos: &[ChunkInfo]) {
    for chunk_info in chunk_infos {
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_CHUNK_INFO]);
        fields.insert("ver", u32_to_bytes(CHUNK_INFO_VERSION));
        fields.insert("chunk_pos", chunk_info.pos.to_le_bytes().to_vec());
        fields.insert("start_time", time_to_bytes(chunk_info.start_time));
        fields.insert("end_time", time_to_bytes(chunk_info.end_time));
        fields.insert(
            "count",
            u32_to_bytes(chunk_info.connection_counts.len() as u32),
        );
        write_header(buffer, &fields);

        write_u32(buffer, (chunk_info.connection_counts.len() * 8) as u32);
        for (&conn_id, &count) in &chunk_info.connection_counts {
            write_u32(buffer, conn_id);
            write_u32(buffer, count);
        }
    }
}

fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn u32_to_bytes(value: u32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

fn time_to_bytes(time: (u32, u32)) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(&time.0.to_le_bytes());
    bytes.extend_from_slice(&time.1.to_le_bytes());
    bytes
}

/// Convert nanoseconds to (sec, nsec) tuple.
fn ns_to_time(ns: u64) -> (u32, u32) {
    ((ns / NANOS_PER_SEC) as u32, (ns % NANOS_PER_SEC) as u32)
}

fn time_less_than(a: (u32, u32), b: (u32, u32)) -> bool {
    a < b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_to_time() {
        assert_eq!(ns_to_time(0), (0, 0));
        assert_eq!(ns_to_time(1_000_000_000), (1, 0));
        assert_eq!(ns_to_time(1_500_000_000), (1, 500_000_000));
        assert_eq!(ns_to_time(1_999_999_999), (1, 999_999_999));
    }

    #[test]
    fn test_time_less_than() {
        assert!(time_less_than((0, 0), (1, 0)));
        assert!(time_less_than((1, 0), (1, 1)));
        assert!(!time_less_than((1, 0), (0, 0)));
        assert!(!time_less_than((1, 1), (1, 0)));
    }

    #[test]
    fn test_file_header_is_4096_bytes() {
        let mut buffer = Vec::new();
        write_file_header_record(&mut buffer, 0, 0, 0);
        assert_eq!(buffer.len(), 4096);
        assert!(buffer.starts_with(b"#ROSBAG V2.0\n"));
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("LZ4".parse::<Compression>().unwrap(), Compression::Lz4);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert!("zstd".parse::<Compression>().is_err());
    }

    #[test]
    fn test_write_rejects_unknown_connection() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BagWriter::create(dir.path().join("a.bag")).unwrap();
        let err = writer
            .write_message(&BagMessage::new(3, 0, vec![]))
            .unwrap_err();
        assert!(err.to_string().contains("conn_id 3"));
        writer.finish().unwrap();
    }

    #[test]
    fn test_message_count_tracks_open_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BagWriter::create(dir.path().join("a.bag")).unwrap();
        let conn = writer.add_connection("/a", "std_msgs/String", "").unwrap();
        writer
            .write_message(&BagMessage::new(conn, 5, b"x".to_vec()))
            .unwrap();
        assert_eq!(writer.message_count(), 1);
        assert_eq!(writer.connection_count(), 1);
        writer.finish().unwrap();
    }
}
