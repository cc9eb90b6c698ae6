// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! Bags are synthesized with the crate's own [`BagWriter`] inside temporary
//! directories, so no binary fixtures are checked in.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use bagframes::io::{BagMessage, BagWriter, Compression};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, RgbImage};

// ============================================================================
// Message Definitions
// ============================================================================

/// ROS1 definition of sensor_msgs/Image
pub const IMAGE_DEF: &str = "std_msgs/Header header\nuint32 height\nuint32 width\nstring encoding\nuint8 is_bigendian\nuint32 step\nuint8[] data\n";

/// ROS1 definition of sensor_msgs/CompressedImage
pub const COMPRESSED_IMAGE_DEF: &str = "std_msgs/Header header\nstring format\nuint8[] data\n";

/// Bag time of the first fixture message: 1_600_000_000 s
pub const BAG_START_NS: u64 = 1_600_000_000_000_000_000;

/// Interval between fixture frames: 100 ms
pub const PERIOD_NS: u64 = 100_000_000;

// ============================================================================
// Payload Serializers
// ============================================================================

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend(&(s.len() as u32).to_le_bytes());
    buf.extend(s.as_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend(&(data.len() as u32).to_le_bytes());
    buf.extend(data);
}

/// Serialized std_msgs/Header.
pub fn header(seq: u32, sec: u32, nsec: u32, frame_id: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend(&seq.to_le_bytes());
    buf.extend(&sec.to_le_bytes());
    buf.extend(&nsec.to_le_bytes());
    put_string(&mut buf, frame_id);
    buf
}

/// Serialized sensor_msgs/Image with tightly packed rows.
pub fn image_payload(
    seq: u32,
    stamp: (u32, u32),
    encoding: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Vec<u8> {
    let step = if height == 0 { 0 } else { pixels.len() as u32 / height };
    let mut buf = header(seq, stamp.0, stamp.1, "camera");
    buf.extend(&height.to_le_bytes());
    buf.extend(&width.to_le_bytes());
    put_string(&mut buf, encoding);
    buf.push(0);
    buf.extend(&step.to_le_bytes());
    put_bytes(&mut buf, pixels);
    buf
}

/// Serialized sensor_msgs/CompressedImage.
pub fn compressed_payload(seq: u32, stamp: (u32, u32), format: &str, data: &[u8]) -> Vec<u8> {
    let mut buf = header(seq, stamp.0, stamp.1, "camera");
    put_string(&mut buf, format);
    put_bytes(&mut buf, data);
    buf
}

/// PNG bytes of a solid RGB image.
pub fn png_rgb(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb(color));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// `compressedDepth` payload bytes: 12 header bytes then a 16-bit PNG.
pub fn depth_data(width: u32, height: u32, values: &[u16]) -> Vec<u8> {
    let img = ImageBuffer::<Luma<u16>, _>::from_raw(width, height, values.to_vec())
        .expect("depth values match dimensions");
    let mut data = vec![0u8; 12];
    data.extend(encode(DynamicImage::ImageLuma16(img), ImageFormat::Png));
    data
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)
        .expect("encode fixture image");
    out
}

/// Split a bag time into header (sec, nsec).
pub fn stamp(time_ns: u64) -> (u32, u32) {
    ((time_ns / 1_000_000_000) as u32, (time_ns % 1_000_000_000) as u32)
}

// ============================================================================
// Bag Builders
// ============================================================================

/// Thin wrapper over [`BagWriter`] for fixtures.
pub struct BagBuilder {
    writer: BagWriter,
    path: PathBuf,
}

impl BagBuilder {
    /// Start a bag at `path`.
    pub fn new(path: &Path) -> Self {
        Self::with_compression(path, Compression::None)
    }

    /// Start a bag with compressed chunks.
    pub fn with_compression(path: &Path, compression: Compression) -> Self {
        let writer = BagWriter::create(path)
            .expect("create bag")
            .with_compression(compression);
        Self {
            writer,
            path: path.to_path_buf(),
        }
    }

    /// Flush chunks after `bytes` of records.
    pub fn chunk_threshold(mut self, bytes: usize) -> Self {
        self.writer = self.writer.with_chunk_threshold(bytes);
        self
    }

    /// Add a connection.
    pub fn connection(&mut self, topic: &str, message_type: &str) -> u32 {
        let def = match message_type {
            "sensor_msgs/Image" => IMAGE_DEF,
            "sensor_msgs/CompressedImage" => COMPRESSED_IMAGE_DEF,
            _ => "",
        };
        self.writer
            .add_connection(topic, message_type, def)
            .expect("add connection")
    }

    /// Write one record.
    pub fn message(&mut self, conn: u32, time_ns: u64, payload: Vec<u8>) -> &mut Self {
        self.writer
            .write_message(&BagMessage::new(conn, time_ns, payload))
            .expect("write message");
        self
    }

    /// Finalize and return the bag path.
    pub fn finish(self) -> PathBuf {
        self.writer.finish().expect("finish bag");
        self.path
    }
}

/// 2x1 rgb8 frame whose first pixel encodes `i`.
pub fn rgb_frame(i: u32, time_ns: u64) -> Vec<u8> {
    let v = (i * 10) as u8;
    image_payload(i, stamp(time_ns), "rgb8", 2, 1, &[v, 0, 0, 0, v, 0])
}

/// Bag with:
/// - `/cam`: `cam_frames` rgb8 frames at 10 Hz from [`BAG_START_NS`]
/// - `/cam/compressed`: 3 PNG frames at 5 Hz
/// - `/imu`: 4 records of a non-image type
pub fn sample_bag(dir: &Path, name: &str, cam_frames: u32) -> PathBuf {
    let mut bag = BagBuilder::new(&dir.join(name)).chunk_threshold(256);
    let cam = bag.connection("/cam", "sensor_msgs/Image");
    let compressed = bag.connection("/cam/compressed", "sensor_msgs/CompressedImage");
    let imu = bag.connection("/imu", "sensor_msgs/Imu");

    for i in 0..cam_frames {
        let t = BAG_START_NS + i as u64 * PERIOD_NS;
        bag.message(cam, t, rgb_frame(i, t));
        if i % 2 == 0 && i / 2 < 3 {
            let png = png_rgb(3, 2, [0, 200, 0]);
            bag.message(compressed, t, compressed_payload(i, stamp(t), "png", &png));
        }
        if i < 4 {
            bag.message(imu, t + 1, vec![1, 2, 3, 4]);
        }
    }
    bag.finish()
}

/// Bag with two image topics sharing timestamps from `start_ns` at 10 Hz:
/// - `/left`: rgb8 frames
/// - `/right`: PNG compressed frames
pub fn stereo_bag(dir: &Path, name: &str, start_ns: u64, frames: u32) -> PathBuf {
    let mut bag = BagBuilder::new(&dir.join(name)).chunk_threshold(512);
    let left = bag.connection("/left", "sensor_msgs/Image");
    let right = bag.connection("/right", "sensor_msgs/CompressedImage");

    let png = png_rgb(2, 2, [0, 0, 200]);
    for i in 0..frames {
        let t = start_ns + i as u64 * PERIOD_NS;
        bag.message(left, t, rgb_frame(i, t));
        bag.message(right, t, compressed_payload(i, stamp(t), "png", &png));
    }
    bag.finish()
}

/// Temporary directory for a test.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}
