// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagframes
//!
//! Image extraction from ROS1 bag files for offline inspection and dataset
//! preparation.
//!
//! The library is organized leaf first:
//! - [`io`] - Bag detection, reading and writing (`none`, `bz2`, `lz4` chunks)
//! - [`encoding`] - ROS1 wire decoding of `sensor_msgs/Image` and
//!   `sensor_msgs/CompressedImage`
//! - [`imaging`] - Pixel buffers, depth colorization, resizing and encoding
//! - [`extract`] - Filters, naming, manifests and the extraction pass
//! - [`summary`], [`clip`], [`video`] - Collaborators built on the reader
//!
//! ## Example: Extracting images
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use bagframes::extract::{extract_images_from_bag, ExtractionConfig, SampleStride};
//!
//! let config = ExtractionConfig::new("frames")
//!     .with_file_format("png")
//!     .with_sample(SampleStride::new(5)?)
//!     .with_window(Some(2.0), Some(30.0));
//! for folder in extract_images_from_bag(Path::new("drive.bag"), &config)? {
//!     println!("Wrote {}", folder.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Reading records
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagframes::{BagReader, TopicFilter};
//!
//! let reader = BagReader::open("drive.bag")?;
//! for item in reader.messages(&TopicFilter::include(["/camera/image_raw"])) {
//!     let (conn, record) = item?;
//!     println!("{} {} bytes @ {}", conn.topic, record.data.len(), record.time_ns);
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

pub use core::{ExtractError, Result};

// Message decoding
pub mod encoding;

// Pixel buffers and image files
pub mod imaging;

// Bag I/O
pub mod io;

pub use io::{BagInfo, BagReader, BagWriter, Connection, RawRecord, TopicFilter, TopicInfo};

// Extraction pipeline
pub mod extract;

pub use extract::{extract_images, extract_images_from_bag, ExtractionConfig, NamingScheme};

// Collaborators
pub mod clip;
pub mod summary;
pub mod video;

pub use clip::{clip_bag, ClipOptions, ClipStats, ClipWindow, TimestampKind};
pub use summary::{summarize_bag, summarize_path, BagSummary};
pub use video::{assemble_video, VideoOptions};
