// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-topic image manifests.
//!
//! A manifest lists every frame written for one topic, keyed by file
//! name, together with the topic's metadata:
//!
//! ```json
//! {
//!   "images": {
//!     "cam_000000.png": {
//!       "msg_timestamp": 16000000005,
//!       "rosbag_timestamp": 1600000000000000005,
//!       "path": "out/cam/cam_000000.png",
//!       "msg_index": 0,
//!       "img_name": "cam_000000.png"
//!     }
//!   },
//!   "topic": { "topic": "/cam", "message_type": "sensor_msgs/Image", ... }
//! }
//! ```
//!
//! Manifests are write-once: an existing file is never replaced.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{ExtractError, Result};
use crate::io::metadata::TopicInfo;

/// File name of the manifest inside a topic folder.
pub const MANIFEST_FILE_NAME: &str = "img_manifest.json";

/// One written frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Header stamp, see [`msg_timestamp`](super::naming::msg_timestamp)
    pub msg_timestamp: u64,
    /// Bag record timestamp in nanoseconds
    pub rosbag_timestamp: u64,
    /// Path of the written image
    pub path: String,
    /// Per-topic message index
    pub msg_index: u64,
    /// Image file name
    pub img_name: String,
}

impl ManifestEntry {
    /// Create an entry; the image name is the last component of `path`.
    pub fn new(msg_timestamp: u64, rosbag_timestamp: u64, path: &Path, msg_index: u64) -> Self {
        Self {
            msg_timestamp,
            rosbag_timestamp,
            path: path.to_string_lossy().to_string(),
            msg_index,
            img_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Manifest of one topic folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicManifest {
    /// Frames keyed by file name
    pub images: BTreeMap<String, ManifestEntry>,
    /// Topic metadata
    pub topic: TopicInfo,
}

impl TopicManifest {
    /// Create an empty manifest.
    pub fn new(topic: TopicInfo) -> Self {
        Self {
            images: BTreeMap::new(),
            topic,
        }
    }

    /// Record a frame.
    pub fn insert(&mut self, entry: ManifestEntry) {
        self.images.insert(entry.img_name.clone(), entry);
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether no frame was recorded.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Write the manifest into `folder` unless one is already there.
    ///
    /// Returns whether a file was written.
    pub fn write_if_absent(&self, folder: &Path) -> Result<bool> {
        let path = folder.join(MANIFEST_FILE_NAME);
        if path.exists() {
            info!(path = %path.display(), "Manifest already exists, leaving it untouched");
            return Ok(false);
        }

        fs::create_dir_all(folder)?;
        let file = File::create(&path).map_err(|e| {
            ExtractError::io("manifest", format!("cannot create {}: {e}", path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;

        debug!(path = %path.display(), images = self.len(), "Wrote manifest");
        Ok(true)
    }
}

/// Read a manifest file, or the manifest inside a topic folder.
pub fn read_manifest(path: &Path) -> Result<TopicManifest> {
    let file_path = if path.is_dir() {
        path.join(MANIFEST_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let file = File::open(&file_path).map_err(|e| {
        ExtractError::not_found(file_path.display().to_string(), e.to_string())
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ExtractError::decode(
            "manifest",
            format!("{}: {e}", file_path.display()),
        )
    })
}
