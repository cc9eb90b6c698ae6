// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed decoding of the two supported image message types.
//!
//! Dispatch is on the connection's declared type name. Only
//! `sensor_msgs/Image` and `sensor_msgs/CompressedImage` are decodable;
//! everything else fails with [`ExtractError::UnsupportedSchema`].

use std::fmt;
use std::str::FromStr;

use super::ros1::Ros1Cursor;
use crate::core::{ExtractError, Result, NANOS_PER_SEC};

/// Supported message schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageSchema {
    /// `sensor_msgs/Image`
    Image,
    /// `sensor_msgs/CompressedImage`
    CompressedImage,
}

impl MessageSchema {
    /// ROS1 type name of raw images.
    pub const IMAGE_TYPE: &'static str = "sensor_msgs/Image";
    /// ROS1 type name of compressed images.
    pub const COMPRESSED_IMAGE_TYPE: &'static str = "sensor_msgs/CompressedImage";

    /// Resolve a declared type name.
    ///
    /// The ROS2 spelling (`sensor_msgs/msg/Image`) is accepted as well.
    pub fn from_type_name(type_name: &str) -> Result<Self> {
        match type_name.replace("/msg/", "/").as_str() {
            Self::IMAGE_TYPE => Ok(MessageSchema::Image),
            Self::COMPRESSED_IMAGE_TYPE => Ok(MessageSchema::CompressedImage),
            _ => Err(ExtractError::unsupported_schema(type_name)),
        }
    }

    /// Whether a type name is one of the supported image types.
    pub fn is_image_type(type_name: &str) -> bool {
        Self::from_type_name(type_name).is_ok()
    }

    /// Canonical ROS1 type name.
    pub fn type_name(self) -> &'static str {
        match self {
            MessageSchema::Image => Self::IMAGE_TYPE,
            MessageSchema::CompressedImage => Self::COMPRESSED_IMAGE_TYPE,
        }
    }
}

impl fmt::Display for MessageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// ROS `time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    /// Seconds
    pub sec: u32,
    /// Nanoseconds within the second
    pub nsec: u32,
}

impl Time {
    /// Create a time from its two fields.
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Total nanoseconds.
    pub fn as_nanos(&self) -> u64 {
        self.sec as u64 * NANOS_PER_SEC + self.nsec as u64
    }
}

/// `std_msgs/Header`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Sequence number
    pub seq: u32,
    /// Acquisition time
    pub stamp: Time,
    /// Coordinate frame
    pub frame_id: String,
}

impl Header {
    fn decode(cursor: &mut Ros1Cursor<'_>) -> Result<Self> {
        let seq = cursor.read_u32()?;
        let (sec, nsec) = cursor.read_time()?;
        let frame_id = cursor.read_string()?;
        Ok(Self {
            seq,
            stamp: Time::new(sec, nsec),
            frame_id,
        })
    }
}

/// Channel layout of a decoded pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// 3 channels
    Rgb,
    /// 4 channels
    Rgba,
    /// 1 channel
    L,
}

impl ChannelLayout {
    /// Number of channels.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
            ChannelLayout::L => 1,
        }
    }
}

/// Supported raw image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    /// `rgb8`
    Rgb8,
    /// `rgba8`
    Rgba8,
    /// `mono8`
    Mono8,
    /// `8UC3`
    Cv8UC3,
    /// `bgra8`, swapped to RGBA
    Bgra8,
    /// `bgr8`, taken as RGB without swapping
    Bgr8,
}

impl PixelEncoding {
    /// Encoding string as it appears in the message.
    pub fn as_str(self) -> &'static str {
        match self {
            PixelEncoding::Rgb8 => "rgb8",
            PixelEncoding::Rgba8 => "rgba8",
            PixelEncoding::Mono8 => "mono8",
            PixelEncoding::Cv8UC3 => "8UC3",
            PixelEncoding::Bgra8 => "bgra8",
            PixelEncoding::Bgr8 => "bgr8",
        }
    }

    /// Layout of the materialized buffer.
    pub fn layout(self) -> ChannelLayout {
        match self {
            PixelEncoding::Rgb8 | PixelEncoding::Cv8UC3 | PixelEncoding::Bgr8 => {
                ChannelLayout::Rgb
            }
            PixelEncoding::Rgba8 | PixelEncoding::Bgra8 => ChannelLayout::Rgba,
            PixelEncoding::Mono8 => ChannelLayout::L,
        }
    }

    /// Whether the first and third channel must be exchanged.
    pub fn swaps_red_blue(self) -> bool {
        matches!(self, PixelEncoding::Bgra8)
    }
}

impl FromStr for PixelEncoding {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rgb8" => Ok(PixelEncoding::Rgb8),
            "rgba8" => Ok(PixelEncoding::Rgba8),
            "mono8" => Ok(PixelEncoding::Mono8),
            "8UC3" => Ok(PixelEncoding::Cv8UC3),
            "bgra8" => Ok(PixelEncoding::Bgra8),
            "bgr8" => Ok(PixelEncoding::Bgr8),
            other => Err(ExtractError::unsupported_encoding(other)),
        }
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `sensor_msgs/Image`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMsg {
    /// Message header
    pub header: Header,
    /// Rows
    pub height: u32,
    /// Columns
    pub width: u32,
    /// Pixel encoding
    pub encoding: PixelEncoding,
    /// Endianness flag of multi-byte pixels
    pub is_bigendian: u8,
    /// Row length in bytes
    pub step: u32,
    /// Pixel bytes, `step * height` long
    pub data: Vec<u8>,
}

impl ImageMsg {
    fn decode(cursor: &mut Ros1Cursor<'_>) -> Result<Self> {
        let header = Header::decode(cursor)?;
        let height = cursor.read_u32()?;
        let width = cursor.read_u32()?;
        let encoding = cursor.read_string()?.parse()?;
        let is_bigendian = cursor.read_u8()?;
        let step = cursor.read_u32()?;
        let data = cursor.read_byte_array()?.to_vec();
        Ok(Self {
            header,
            height,
            width,
            encoding,
            is_bigendian,
            step,
            data,
        })
    }
}

/// `sensor_msgs/CompressedImage`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedImageMsg {
    /// Message header
    pub header: Header,
    /// Format string, e.g. `jpeg` or `16UC1; compressedDepth png`
    pub format: String,
    /// Compressed bytes
    pub data: Vec<u8>,
}

impl CompressedImageMsg {
    /// Marker identifying depth payloads in the format string.
    pub const DEPTH_MARKER: &'static str = "compressedDepth";

    fn decode(cursor: &mut Ros1Cursor<'_>) -> Result<Self> {
        let header = Header::decode(cursor)?;
        let format = cursor.read_string()?;
        let data = cursor.read_byte_array()?.to_vec();
        Ok(Self {
            header,
            format,
            data,
        })
    }

    /// Whether the payload carries the depth header and encoding.
    pub fn is_compressed_depth(&self) -> bool {
        self.format.contains(Self::DEPTH_MARKER)
    }
}

/// A decoded image message.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    /// Raw pixels
    Image(ImageMsg),
    /// Compressed bytes
    CompressedImage(CompressedImageMsg),
}

impl DecodedMessage {
    /// Message header.
    pub fn header(&self) -> &Header {
        match self {
            DecodedMessage::Image(m) => &m.header,
            DecodedMessage::CompressedImage(m) => &m.header,
        }
    }

    /// Schema the message was decoded as.
    pub fn schema(&self) -> MessageSchema {
        match self {
            DecodedMessage::Image(_) => MessageSchema::Image,
            DecodedMessage::CompressedImage(_) => MessageSchema::CompressedImage,
        }
    }
}

/// Decode a ROS1 payload according to its declared type name.
pub fn decode_message(type_name: &str, payload: &[u8]) -> Result<DecodedMessage> {
    let schema = MessageSchema::from_type_name(type_name)?;
    let mut cursor = Ros1Cursor::new(payload);
    let message = match schema {
        MessageSchema::Image => DecodedMessage::Image(ImageMsg::decode(&mut cursor)?),
        MessageSchema::CompressedImage => {
            DecodedMessage::CompressedImage(CompressedImageMsg::decode(&mut cursor)?)
        }
    };
    Ok(message)
}
