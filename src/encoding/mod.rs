// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message decoding.
//!
//! - [`ros1`] - Cursor over ROS1 serialized bytes
//! - [`sensor_msgs`] - Typed image messages and schema dispatch

pub mod ros1;
pub mod sensor_msgs;

pub use ros1::Ros1Cursor;
pub use sensor_msgs::{
    decode_message, ChannelLayout, CompressedImageMsg, DecodedMessage, Header, ImageMsg,
    MessageSchema, PixelEncoding, Time,
};
