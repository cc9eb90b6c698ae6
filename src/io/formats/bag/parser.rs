// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag record parser.
//!
//! The parser memory-maps the bag, reads the bag header record to locate
//! the index section, and loads connection and chunk-info records from it.
//! Bags without an index (recording interrupted before close) are scanned
//! record by record instead.
//!
//! # BAG Format Structure (Version 2.0)
//!
//! ## File Header
//! - Magic: "#ROSBAG V2.0\n" (13 bytes)
//! - Followed by bag header record in standard record format
//!
//! ## Record Format
//! All records follow: `<header_len: u32><header><data_len: u32><data>`
//! where header contains `<field_len: u32><field_name>=<field_value>` pairs
//!
//! ## Op Codes
//! - 0x02: Message data
//! - 0x03: Bag header
//! - 0x04: Index data
//! - 0x05: Chunk
//! - 0x06: Chunk info
//! - 0x07: Connection

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{ExtractError, Result, NANOS_PER_SEC};
use crate::io::metadata::Connection;

/// BAG op codes
pub(crate) const OP_MSG_DATA: u8 = 0x02;
pub(crate) const OP_BAG_HEADER: u8 = 0x03;
pub(crate) const OP_INDEX_DATA: u8 = 0x04;
pub(crate) const OP_CHUNK: u8 = 0x05;
pub(crate) const OP_CHUNK_INFO: u8 = 0x06;
pub(crate) const OP_CONNECTION: u8 = 0x07;

/// Only bag format version understood by this parser.
pub const SUPPORTED_VERSION: &str = "2.0";

/// BAG file header information.
#[derive(Debug, Clone)]
pub struct BagHeader {
    /// Version string (e.g., "2.0")
    pub version: String,
    /// Position of index section in file, 0 when the bag was not closed
    pub index_pos: u64,
    /// Number of connections in the file
    pub conn_count: u32,
    /// Number of chunks in the file
    pub chunk_count: u32,
}

/// BAG chunk information.
#[derive(Debug, Clone)]
pub struct BagChunkInfo {
    /// Chunk sequence number in file order
    pub sequence: u64,
    /// Offset of chunk record in file (position of header_len)
    pub chunk_pos: u64,
    /// Start time of messages in this chunk
    pub start_time: u64,
    /// End time of messages in this chunk
    pub end_time: u64,
    /// `(connection id, message count)` for every connection in the chunk
    pub connection_counts: Vec<(u32, u32)>,
}

impl BagChunkInfo {
    /// Number of messages in this chunk.
    pub fn message_count(&self) -> u64 {
        self.connection_counts.iter().map(|(_, n)| *n as u64).sum()
    }
}

/// One message data record read out of a chunk.
#[derive(Debug, Clone)]
pub struct ChunkMessage {
    /// Connection the record belongs to
    pub conn_id: u32,
    /// Record timestamp in nanoseconds
    pub time: u64,
    /// Serialized message bytes
    pub data: Vec<u8>,
}

/// Timestamp of one message as listed in an index data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Connection ID
    pub conn_id: u32,
    /// Record timestamp in nanoseconds
    pub time: u64,
}

/// Parsed fields from a BAG record header
#[derive(Debug, Default)]
pub(crate) struct RecordHeader {
    pub(crate) op: Option<u8>,
    pub(crate) conn: Option<u32>,
    pub(crate) time: Option<u64>,
    pub(crate) topic: Option<String>,
    pub(crate) md5sum: Option<String>,
    pub(crate) message_type: Option<String>,
    pub(crate) message_definition: Option<String>,
    pub(crate) callerid: Option<String>,
    pub(crate) index_pos: Option<u64>,
    pub(crate) conn_count: Option<u32>,
    pub(crate) chunk_count: Option<u32>,
    pub(crate) chunk_pos: Option<u64>,
    pub(crate) start_time: Option<u64>,
    pub(crate) end_time: Option<u64>,
    pub(crate) compression: Option<String>,
    pub(crate) size: Option<u32>,
    pub(crate) ver: Option<u32>,
    pub(crate) count: Option<u32>,
}

/// Memory-mapped bag parser.
pub struct BagParser {
    path: String,
    header: BagHeader,
    chunks: Vec<BagChunkInfo>,
    connections: BTreeMap<u32, Connection>,
    mmap: memmap2::Mmap,
    file_size: u64,
}

impl BagParser {
    /// BAG magic string
    const MAGIC: &[u8] = b"#ROSBAG V";

    /// Open a BAG file and load its metadata.
    ///
    /// Any failure after the file is opened is reported as
    /// [`ExtractError::CorruptContainer`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::open_inner(&path_str).map_err(|e| into_corrupt(&path_str, e))
    }

    fn open_inner(path_str: &str) -> Result<Self> {
        let file = File::open(path_str)
            .map_err(|e| ExtractError::io("BagParser::open", format!("Failed to open: {e}")))?;
        let file_size = file.metadata()?.len();

        // SAFETY: the map is read-only and lives as long as the parser.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| ExtractError::io("BagParser::open", format!("Failed to mmap: {e}")))?;

        let mut cursor = Cursor::new(&mmap[..]);
        let version = Self::parse_magic(&mut cursor)?;
        if version != SUPPORTED_VERSION {
            return Err(ExtractError::decode(
                "BagParser::parse_magic",
                format!("Unsupported bag version {version}"),
            ));
        }
        let header = Self::parse_bag_header_record(&mut cursor, version)?;
        let data_start = cursor.position();

        let (chunks, mut connections) =
            if header.index_pos > 0 && header.index_pos < mmap.len() as u64 {
                Self::parse_index_section(&mmap, header.index_pos)?
            } else {
                Self::scan_file_for_metadata(&mmap, data_start)?
            };

        for chunk in &chunks {
            for &(conn_id, count) in &chunk.connection_counts {
                if let Some(conn) = connections.get_mut(&conn_id) {
                    conn.message_count += count as u64;
                }
            }
        }

        Ok(Self {
            path: path_str.to_string(),
            header,
            chunks,
            connections,
            mmap,
            file_size,
        })
    }

    /// Parse the BAG magic string and return version.
    fn parse_magic<R: Read>(reader: &mut R) -> Result<String> {
        let mut magic = [0u8; 9];
        reader.read_exact(&mut magic).map_err(|e| {
            ExtractError::decode("BagParser::parse_magic", format!("Failed to read magic: {e}"))
        })?;

        if magic != Self::MAGIC {
            return Err(ExtractError::decode(
                "BagParser::parse_magic",
                format!("Invalid BAG magic: {:?}", String::from_utf8_lossy(&magic)),
            ));
        }

        // Version line, e.g. "2.0\n"
        let mut version_buf = [0u8; 4];
        reader.read_exact(&mut version_buf).map_err(|e| {
            ExtractError::decode(
                "BagParser::parse_magic",
                format!("Failed to read version: {e}"),
            )
        })?;

        Ok(String::from_utf8_lossy(&version_buf).trim().to_string())
    }

    /// Parse the bag header record (first record after magic).
    fn parse_bag_header_record(
        cursor: &mut Cursor<&[u8]>,
        version: String,
    ) -> Result<BagHeader> {
        let (fields, _data) = read_record(cursor)?;

        if fields.op != Some(OP_BAG_HEADER) {
            return Err(ExtractError::decode(
                "BagParser::parse_bag_header",
                format!(
                    "Expected bag header record (op=0x03), got op={:?}",
                    fields.op
                ),
            ));
        }

        Ok(BagHeader {
            version,
            index_pos: fields.index_pos.unwrap_or(0),
            conn_count: fields.conn_count.unwrap_or(0),
            chunk_count: fields.chunk_count.unwrap_or(0),
        })
    }

    /// Parse the index section to get chunk info and connections.
    fn parse_index_section(
        mmap: &[u8],
        index_pos: u64,
    ) -> Result<(Vec<BagChunkInfo>, BTreeMap<u32, Connection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(index_pos);

        let mut chunks = Vec::new();
        let mut connections = BTreeMap::new();

        while (cursor.position() as usize) < mmap.len() {
            let (fields, data) = read_record(&mut cursor)?;

            match fields.op {
                Some(OP_CONNECTION) => {
                    let conn = connection_from_record(&fields, &data)?;
                    connections.insert(conn.id, conn);
                }
                Some(OP_CHUNK_INFO) => {
                    let sequence = chunks.len() as u64;
                    chunks.push(chunk_info_from_record(&fields, &data, sequence)?);
                }
                _ => {}
            }
        }

        chunks.sort_by_key(|c| c.chunk_pos);
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.sequence = i as u64;
        }

        Ok((chunks, connections))
    }

    /// Scan the record stream when no index section is available.
    ///
    /// Every chunk is decompressed once to recover its connections, counts
    /// and time range. A truncated trailing record ends the scan.
    fn scan_file_for_metadata(
        mmap: &[u8],
        data_start: u64,
    ) -> Result<(Vec<BagChunkInfo>, BTreeMap<u32, Connection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(data_start);

        let mut chunks = Vec::new();
        let mut connections = BTreeMap::new();

        while (cursor.position() as usize) < mmap.len() {
            let record_start = cursor.position();
            let (fields, data) = match read_record(&mut cursor) {
                Ok(r) => r,
                Err(_) => break,
            };

            match fields.op {
                Some(OP_CONNECTION) => {
                    let conn = connection_from_record(&fields, &data)?;
                    connections.insert(conn.id, conn);
                }
                Some(OP_CHUNK) => {
                    let decompressed =
                        decompress(fields.compression.as_deref(), fields.size, data)?;
                    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
                    let mut start_time = u64::MAX;
                    let mut end_time = 0u64;

                    let mut inner = Cursor::new(&decompressed[..]);
                    while (inner.position() as usize) < decompressed.len() {
                        let (rec, rec_data) = read_record(&mut inner)?;
                        match rec.op {
                            Some(OP_CONNECTION) => {
                                let conn = connection_from_record(&rec, &rec_data)?;
                                connections.entry(conn.id).or_insert(conn);
                            }
                            Some(OP_MSG_DATA) => {
                                if let Some(conn_id) = rec.conn {
                                    *counts.entry(conn_id).or_default() += 1;
                                    let time = rec.time.unwrap_or(0);
                                    start_time = start_time.min(time);
                                    end_time = end_time.max(time);
                                }
                            }
                            _ => {}
                        }
                    }

                    if !counts.is_empty() {
                        chunks.push(BagChunkInfo {
                            sequence: chunks.len() as u64,
                            chunk_pos: record_start,
                            start_time,
                            end_time,
                            connection_counts: counts.into_iter().collect(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok((chunks, connections))
    }

    /// Get chunk information in file order.
    pub fn chunks(&self) -> &[BagChunkInfo] {
        &self.chunks
    }

    /// Get connections keyed by ID.
    pub fn connections(&self) -> &BTreeMap<u32, Connection> {
        &self.connections
    }

    /// Get the file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get header info.
    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    /// Earliest chunk start time, 0 for a bag without messages.
    pub fn start_time(&self) -> u64 {
        self.chunks.iter().map(|c| c.start_time).min().unwrap_or(0)
    }

    /// Latest chunk end time, 0 for a bag without messages.
    pub fn end_time(&self) -> u64 {
        self.chunks.iter().map(|c| c.end_time).max().unwrap_or(0)
    }

    /// Read and decompress a single chunk.
    pub fn read_chunk(&self, chunk_info: &BagChunkInfo) -> Result<Vec<u8>> {
        self.read_chunk_inner(chunk_info)
            .map_err(|e| into_corrupt(&self.path, e))
    }

    fn read_chunk_inner(&self, chunk_info: &BagChunkInfo) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.set_position(chunk_info.chunk_pos);

        let (fields, data) = read_record(&mut cursor)?;

        if fields.op != Some(OP_CHUNK) {
            return Err(ExtractError::decode(
                "BagParser::read_chunk",
                format!("Expected chunk record (op=0x05), got op={:?}", fields.op),
            ));
        }

        decompress(fields.compression.as_deref(), fields.size, data)
    }

    /// Read the index data records that follow a chunk.
    ///
    /// Falls back to the chunk's own message records when the writer did
    /// not emit index data.
    pub fn chunk_index(&self, chunk_info: &BagChunkInfo) -> Result<Vec<IndexEntry>> {
        self.chunk_index_inner(chunk_info)
            .map_err(|e| into_corrupt(&self.path, e))
    }

    fn chunk_index_inner(&self, chunk_info: &BagChunkInfo) -> Result<Vec<IndexEntry>> {
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.set_position(chunk_info.chunk_pos);
        skip_record(&mut cursor)?;

        let mut entries = Vec::new();
        while (cursor.position() as usize) < self.mmap.len() {
            let record_start = cursor.position();
            let (fields, data) = read_record(&mut cursor)?;
            if fields.op != Some(OP_INDEX_DATA) {
                cursor.set_position(record_start);
                break;
            }
            let conn_id = fields.conn.unwrap_or(0);
            let count = fields.count.unwrap_or(0) as usize;
            let mut index = Cursor::new(&data[..]);
            for _ in 0..count {
                let sec = index.read_u32::<LittleEndian>()?;
                let nsec = index.read_u32::<LittleEndian>()?;
                let _offset = index.read_u32::<LittleEndian>()?;
                entries.push(IndexEntry {
                    conn_id,
                    time: sec as u64 * NANOS_PER_SEC + nsec as u64,
                });
            }
        }

        if entries.is_empty() && chunk_info.message_count() > 0 {
            let data = self.read_chunk_inner(chunk_info)?;
            entries = parse_chunk_messages(&data, |_| true)?
                .into_iter()
                .map(|m| IndexEntry {
                    conn_id: m.conn_id,
                    time: m.time,
                })
                .collect();
        }

        Ok(entries)
    }
}

/// Turn a parse error into a corrupt container error for `path`.
fn into_corrupt(path: &str, err: ExtractError) -> ExtractError {
    if err.is_corrupt_container() {
        err
    } else {
        ExtractError::corrupt(path, err.to_string())
    }
}

/// Decompress chunk data according to its `compression` field.
pub(crate) fn decompress(
    compression: Option<&str>,
    size: Option<u32>,
    data: Vec<u8>,
) -> Result<Vec<u8>> {
    let compression = compression.unwrap_or("none");

    let decompressed = match compression {
        "none" => data,
        "bz2" => {
            use bzip2::read::BzDecoder;
            let mut decoder = BzDecoder::new(&data[..]);
            let mut out = Vec::with_capacity(size.unwrap_or(0) as usize);
            decoder.read_to_end(&mut out).map_err(|e| {
                ExtractError::decode("BagParser::decompress", format!("BZ2 decompression failed: {e}"))
            })?;
            out
        }
        "lz4" => {
            use lz4_flex::frame::FrameDecoder;
            let mut decoder = FrameDecoder::new(&data[..]);
            let mut out = Vec::with_capacity(size.unwrap_or(0) as usize);
            decoder.read_to_end(&mut out).map_err(|e| {
                ExtractError::decode("BagParser::decompress", format!("LZ4 decompression failed: {e}"))
            })?;
            out
        }
        other => {
            return Err(ExtractError::decode(
                "BagParser::decompress",
                format!("Unsupported compression format: {other}"),
            ));
        }
    };

    if let Some(expected) = size {
        if decompressed.len() != expected as usize {
            return Err(ExtractError::decode(
                "BagParser::decompress",
                format!(
                    "Chunk size mismatch: header says {expected}, got {}",
                    decompressed.len()
                ),
            ));
        }
    }

    Ok(decompressed)
}

/// Parse message data records from decompressed chunk data.
///
/// Only records whose connection passes `keep` are copied out.
pub(crate) fn parse_chunk_messages<F>(chunk_data: &[u8], keep: F) -> Result<Vec<ChunkMessage>>
where
    F: Fn(u32) -> bool,
{
    let mut cursor = Cursor::new(chunk_data);
    let mut messages = Vec::new();

    while (cursor.position() as usize) < chunk_data.len() {
        let (_, fields) = read_record_header(&mut cursor)?;
        let data_len = read_len(&mut cursor, "data_len")?;
        let data_start = cursor.position() as usize;
        let data_end = data_start + data_len;
        if fields.op == Some(OP_MSG_DATA) {
            if let Some(conn_id) = fields.conn.filter(|id| keep(*id)) {
                messages.push(ChunkMessage {
                    conn_id,
                    time: fields.time.unwrap_or(0),
                    data: chunk_data[data_start..data_end].to_vec(),
                });
            }
        }
        cursor.set_position(data_end as u64);
    }

    Ok(messages)
}

/// Read a length prefix and check it against the remaining bytes.
fn read_len(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<usize> {
    let len = cursor.read_u32::<LittleEndian>().map_err(|e| {
        ExtractError::decode("BagParser::read_record", format!("Failed to read {what}: {e}"))
    })? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(ExtractError::decode(
            "BagParser::read_record",
            format!("{what} {len} exceeds remaining {remaining} bytes"),
        ));
    }
    Ok(len)
}

fn read_record_header(cursor: &mut Cursor<&[u8]>) -> Result<(usize, RecordHeader)> {
    let header_len = read_len(cursor, "header_len")?;
    let start = cursor.position() as usize;
    let fields = parse_record_header(&cursor.get_ref()[start..start + header_len]);
    cursor.set_position((start + header_len) as u64);
    Ok((header_len, fields))
}

/// Read a single BAG record: `<header_len: u32><header><data_len: u32><data>`
pub(crate) fn read_record(cursor: &mut Cursor<&[u8]>) -> Result<(RecordHeader, Vec<u8>)> {
    let (_, fields) = read_record_header(cursor)?;
    let data_len = read_len(cursor, "data_len")?;
    let start = cursor.position() as usize;
    let data = cursor.get_ref()[start..start + data_len].to_vec();
    cursor.set_position((start + data_len) as u64);
    Ok((fields, data))
}

/// Advance past one record without copying its data.
fn skip_record(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    let header_len = read_len(cursor, "header_len")?;
    cursor.set_position(cursor.position() + header_len as u64);
    let data_len = read_len(cursor, "data_len")?;
    cursor.set_position(cursor.position() + data_len as u64);
    Ok(())
}

/// Parse header bytes into named fields.
/// Format: sequence of `<field_len: u32><field_name>=<field_value>`
pub(crate) fn parse_record_header(header_bytes: &[u8]) -> RecordHeader {
    let mut cursor = Cursor::new(header_bytes);
    let mut fields = RecordHeader::default();

    while (cursor.position() as usize) < header_bytes.len() {
        let field_len = match cursor.read_u32::<LittleEndian>() {
            Ok(len) => len as usize,
            Err(_) => break,
        };
        if field_len == 0 {
            continue;
        }

        let mut field_bytes = vec![0u8; field_len];
        if cursor.read_exact(&mut field_bytes).is_err() {
            break;
        }

        if let Some(eq_pos) = field_bytes.iter().position(|&b| b == b'=') {
            parse_field(&mut fields, &field_bytes[..eq_pos], &field_bytes[eq_pos + 1..]);
        }
    }

    fields
}

fn le_u32(value: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(value.get(..4)?.try_into().ok()?))
}

fn le_u64(value: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(value.get(..8)?.try_into().ok()?))
}

/// ROS time: sec (4 bytes) + nsec (4 bytes)
fn ros_time(value: &[u8]) -> Option<u64> {
    let sec = le_u32(value)? as u64;
    let nsec = le_u32(value.get(4..)?)? as u64;
    Some(sec * NANOS_PER_SEC + nsec)
}

fn text(value: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(value).to_string())
}

/// Parse a single field from name and value bytes.
fn parse_field(fields: &mut RecordHeader, name: &[u8], value: &[u8]) {
    match name {
        b"op" if value.len() == 1 => fields.op = Some(value[0]),
        b"conn" => fields.conn = le_u32(value),
        b"time" => fields.time = ros_time(value),
        b"topic" => fields.topic = text(value),
        b"md5sum" => fields.md5sum = text(value),
        b"type" => fields.message_type = text(value),
        b"message_definition" => fields.message_definition = text(value),
        b"callerid" => fields.callerid = text(value),
        b"index_pos" => fields.index_pos = le_u64(value),
        b"conn_count" => fields.conn_count = le_u32(value),
        b"chunk_count" => fields.chunk_count = le_u32(value),
        b"chunk_pos" => fields.chunk_pos = le_u64(value),
        b"start_time" => fields.start_time = ros_time(value),
        b"end_time" => fields.end_time = ros_time(value),
        b"compression" => fields.compression = text(value),
        b"size" => fields.size = le_u32(value),
        b"ver" => fields.ver = le_u32(value),
        b"count" => fields.count = le_u32(value),
        _ => {}
    }
}

/// Build a connection from a connection record.
///
/// The record header holds `conn` and `topic`; the data section holds a
/// second field list with `type`, `md5sum`, `message_definition` and
/// optionally `callerid`.
fn connection_from_record(fields: &RecordHeader, data: &[u8]) -> Result<Connection> {
    let data_fields = parse_record_header(data);
    let (Some(id), Some(topic)) = (fields.conn, fields.topic.clone()) else {
        return Err(ExtractError::decode(
            "BagParser::connection",
            "connection record without conn/topic",
        ));
    };
    let message_type = data_fields.message_type.ok_or_else(|| {
        ExtractError::decode(
            "BagParser::connection",
            format!("connection {id} ({topic}) has no type"),
        )
    })?;

    let mut conn = Connection::new(id, topic, message_type);
    conn.md5sum = data_fields.md5sum.unwrap_or_default();
    conn.message_definition = data_fields.message_definition.unwrap_or_default();
    conn.callerid = data_fields.callerid.unwrap_or_default();
    Ok(conn)
}

/// Build a chunk info from a chunk info record.
///
/// Data: `ver` (u32), then for each connection `conn` (u32), `count` (u32).
fn chunk_info_from_record(
    fields: &RecordHeader,
    data: &[u8],
    sequence: u64,
) -> Result<BagChunkInfo> {
    let chunk_pos = fields.chunk_pos.ok_or_else(|| {
        ExtractError::decode("BagParser::chunk_info", "chunk info without chunk_pos")
    })?;

    let declared = fields
        .count
        .map(|c| c as usize)
        .unwrap_or(data.len() / 8);
    let mut connection_counts = Vec::with_capacity(declared);
    let mut cursor = Cursor::new(data);
    for _ in 0..declared {
        let conn = cursor.read_u32::<LittleEndian>()?;
        let count = cursor.read_u32::<LittleEndian>()?;
        connection_counts.push((conn, count));
    }

    Ok(BagChunkInfo {
        sequence,
        chunk_pos,
        start_time: fields.start_time.unwrap_or(0),
        end_time: fields.end_time.unwrap_or(0),
        connection_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(&((name.len() + 1 + value.len()) as u32).to_le_bytes());
        out.extend(name.as_bytes());
        out.push(b'=');
        out.extend(value);
        out
    }

    fn record(header: &[u8], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(&(header.len() as u32).to_le_bytes());
        out.extend(header);
        out.extend(&(data.len() as u32).to_le_bytes());
        out.extend(data);
        out
    }

    #[test]
    fn test_parse_record_header() {
        let mut header_bytes = field("op", &[OP_MSG_DATA]);
        header_bytes.extend(field("conn", &1u32.to_le_bytes()));

        let fields = parse_record_header(&header_bytes);
        assert_eq!(fields.op, Some(0x02));
        assert_eq!(fields.conn, Some(1));
    }

    #[test]
    fn test_parse_time_field() {
        let mut time = Vec::new();
        time.extend(&1234567890u32.to_le_bytes());
        time.extend(&123456789u32.to_le_bytes());

        let fields = parse_record_header(&field("time", &time));
        assert_eq!(fields.time, Some(1234567890u64 * NANOS_PER_SEC + 123456789));
    }

    #[test]
    fn test_short_numeric_field_is_ignored() {
        let fields = parse_record_header(&field("conn", &[1, 0]));
        assert_eq!(fields.conn, None);
    }

    #[test]
    fn test_read_record_rejects_oversized_length() {
        let mut bytes = Vec::new();
        bytes.extend(&1000u32.to_le_bytes());
        bytes.extend(b"short");
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(read_record(&mut cursor).is_err());
    }

    #[test]
    fn test_parse_chunk_messages_filters_connections() {
        let mut chunk = Vec::new();
        for (conn, payload) in [(0u32, b"aa"), (1u32, b"bb"), (0u32, b"cc")] {
            let mut header = field("op", &[OP_MSG_DATA]);
            header.extend(field("conn", &conn.to_le_bytes()));
            header.extend(field("time", &[1, 0, 0, 0, 0, 0, 0, 0]));
            chunk.extend(record(&header, payload));
        }

        let messages = parse_chunk_messages(&chunk, |id| id == 0).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].data, b"aa");
        assert_eq!(messages[1].data, b"cc");
        assert_eq!(messages[1].time, NANOS_PER_SEC);
    }

    #[test]
    fn test_decompress_rejects_unknown_codec() {
        let err = decompress(Some("zstd"), None, vec![1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("zstd"));
    }

    #[test]
    fn test_decompress_checks_size() {
        assert!(decompress(Some("none"), Some(3), vec![1, 2, 3]).is_ok());
        assert!(decompress(Some("none"), Some(4), vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_open_reports_corrupt_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bag");
        std::fs::write(&path, b"#ROSBAG V2.0\n\xff\xff\xff\xff").unwrap();

        match BagParser::open(&path) {
            Err(ExtractError::CorruptContainer { path: p, .. }) => {
                assert!(p.ends_with("broken.bag"))
            }
            other => panic!("expected corrupt container, got {:?}", other.err()),
        }
    }
}
