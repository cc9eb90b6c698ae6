// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Image extraction pipeline.
//!
//! - [`config`] - Extraction settings, builder and TOML loading
//! - [`window`] - Time window and sampling filters
//! - [`naming`] - Folder and file naming
//! - [`manifest`] - Per-topic `img_manifest.json`
//! - [`images`] - The extraction pass itself

pub mod config;
pub mod images;
pub mod manifest;
pub mod naming;
pub mod window;

pub use config::{parse_resize, parse_topics, ExtractionConfig, DEFAULT_FILE_FORMAT};
pub use images::{extract_images, extract_images_from_bag, BagExtraction, TopicState};
pub use manifest::{read_manifest, ManifestEntry, TopicManifest, MANIFEST_FILE_NAME};
pub use naming::{
    image_file_name, msg_timestamp, sequential_name, topic_folder_name, NamingScheme,
    DEFAULT_INDEX_PADDING,
};
pub use window::{
    convert_offset_to_absolute, estimate_frames, is_within_and_past_end, SampleStride, TimeWindow,
};
