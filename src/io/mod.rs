// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for ROS1 bag files.
//!
//! This module provides bag detection, the metadata types produced when a
//! bag is opened, topic filtering, and the bag reader and writer.

pub mod detection;
pub mod formats;
pub mod metadata;

// Re-exports
pub use detection::{ensure_bag_file, find_bag_files, is_bag_file, resolve_inputs};
pub use metadata::{BagInfo, Connection, RawRecord, TopicInfo};

// Filter for topic filtering
pub mod filter;
pub use filter::TopicFilter;

pub use formats::bag::{BagMessage, BagReader, BagWriter, Compression};
