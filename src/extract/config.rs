// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Extraction configuration.
//!
//! [`ExtractionConfig`] is built either in code with the `with_*` methods
//! or loaded from the `[extract]` table of a TOML file:
//!
//! ```toml
//! [extract]
//! topics = ["/camera/image_raw"]
//! output_dir = "frames"
//! file_format = "png"
//! naming = "rosbag_timestamp"
//! resize = [640, 480]
//! sample = 5
//! start = 2.0
//! end = 30.0
//! ```
//!
//! # Example
//!
//! ```
//! use bagframes::extract::{ExtractionConfig, NamingScheme};
//!
//! let config = ExtractionConfig::new("frames")
//!     .with_topics(["/camera/image_raw"])
//!     .with_naming(NamingScheme::MsgTimestamp)
//!     .with_resize(320, 240);
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::naming::NamingScheme;
use super::window::{SampleStride, TimeWindow};
use crate::core::{ExtractError, Result};

/// Default image file extension.
pub const DEFAULT_FILE_FORMAT: &str = "jpg";

/// Settings of one image extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Topics to extract; empty means every image topic of the bag
    pub topics: Vec<String>,
    /// Root folder for topic folders
    pub output_dir: PathBuf,
    /// Image file extension, which also selects the encoder
    pub file_format: String,
    /// File stem scheme
    pub naming: NamingScheme,
    /// Exact output size `(width, height)`
    pub resize: Option<(u32, u32)>,
    /// Keep every N-th message per topic
    pub sample: Option<SampleStride>,
    /// Window in seconds relative to the bag start
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Write `img_manifest.json` per topic
    pub create_manifest: bool,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            output_dir: PathBuf::from("."),
            file_format: DEFAULT_FILE_FORMAT.to_string(),
            naming: NamingScheme::default(),
            resize: None,
            sample: None,
            window: TimeWindow::unbounded(),
            create_manifest: true,
            show_progress: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    extract: ExtractionConfig,
}

impl ExtractionConfig {
    /// Create a configuration writing below `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Parse the `[extract]` table of a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| ExtractError::validation("config", e.to_string()))?;
        Ok(file.extract)
    }

    /// Load the `[extract]` table of a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ExtractError::not_found(path.display().to_string(), e.to_string())
        })?;
        Self::from_toml_str(&text)
    }

    /// Restrict extraction to these topics.
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output root.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the image file extension.
    #[must_use]
    pub fn with_file_format(mut self, extension: impl Into<String>) -> Self {
        self.file_format = extension.into();
        self
    }

    /// Set the naming scheme.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    /// Resize every frame to exactly `width x height`.
    #[must_use]
    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    /// Keep every `stride`-th message per topic.
    #[must_use]
    pub fn with_sample(mut self, stride: SampleStride) -> Self {
        self.sample = Some(stride);
        self
    }

    /// Limit extraction to a window relative to the bag start.
    #[must_use]
    pub fn with_window(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.window = TimeWindow::new(start, end);
        self
    }

    /// Enable or disable manifest files.
    #[must_use]
    pub fn with_manifest(mut self, enabled: bool) -> Self {
        self.create_manifest = enabled;
        self
    }

    /// Enable or disable the progress bar.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Encoder selected by the file extension.
    pub fn image_format(&self) -> Result<ImageFormat> {
        let format = ImageFormat::from_extension(&self.file_format).ok_or_else(|| {
            ExtractError::validation(
                "file_format",
                format!("unknown image extension '{}'", self.file_format),
            )
        })?;
        if !format.writing_enabled() {
            return Err(ExtractError::validation(
                "file_format",
                format!("cannot write '{}' images", self.file_format),
            ));
        }
        Ok(format)
    }

    /// Check every setting. Runs before any file is touched.
    pub fn validate(&self) -> Result<()> {
        self.image_format()?;

        if let Some((w, h)) = self.resize {
            if w == 0 || h == 0 {
                return Err(ExtractError::validation(
                    "resize",
                    format!("{w}x{h} has a zero dimension"),
                ));
            }
        }

        self.window.validate()?;
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if start > end {
                return Err(ExtractError::validation(
                    "window",
                    format!("start {start} is after end {end}"),
                ));
            }
        }

        if let Some(topic) = self.topics.iter().find(|t| t.trim().is_empty()) {
            return Err(ExtractError::validation(
                "topics",
                format!("empty topic name in {:?} ({topic:?})", self.topics),
            ));
        }

        Ok(())
    }
}

/// Parse a `"width,height"` resize argument.
pub fn parse_resize(text: &str) -> Result<(u32, u32)> {
    let invalid = |why: &str| {
        ExtractError::validation("resize", format!("'{text}': {why}, expected width,height"))
    };

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [w, h] = parts.as_slice() else {
        return Err(invalid("need exactly two values"));
    };
    if w.is_empty() || h.is_empty() {
        return Err(invalid("empty value"));
    }
    let width: u32 = w.parse().map_err(|_| invalid("width is not an integer"))?;
    let height: u32 = h.parse().map_err(|_| invalid("height is not an integer"))?;
    if width == 0 || height == 0 {
        return Err(invalid("zero dimension"));
    }
    Ok((width, height))
}

/// Parse a comma separated topic list, dropping empty items.
pub fn parse_topics(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
