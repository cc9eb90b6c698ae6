// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Video assembly from an extracted topic folder.
//!
//! The frames of one topic folder are encoded to H.264 by an external
//! `ffmpeg` process. The frame rate defaults to the topic frequency stored
//! in the folder's manifest.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::core::{ExtractError, Result};
use crate::extract::manifest::read_manifest;

/// Default output file name.
pub const DEFAULT_VIDEO_NAME: &str = "video.mp4";

/// Default encoder program.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Image extensions tried in order; the first with any file wins.
const FRAME_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Options of one video assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    /// Output file name inside the folder
    pub output_name: String,
    /// Frames per second; read from the manifest when unset
    pub frame_rate: Option<f64>,
    /// Scale factor applied to both dimensions
    pub scale: Option<f64>,
    /// Keep the frames after encoding
    pub keep_images: bool,
    /// Encoder program
    pub ffmpeg: PathBuf,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_VIDEO_NAME.to_string(),
            frame_rate: None,
            scale: None,
            keep_images: true,
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
        }
    }
}

impl VideoOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the manifest frame rate.
    #[must_use]
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Scale frames by `factor`.
    #[must_use]
    pub fn with_scale(mut self, factor: f64) -> Self {
        self.scale = Some(factor);
        self
    }

    /// Keep or delete the frames after encoding.
    #[must_use]
    pub fn with_keep_images(mut self, keep: bool) -> Self {
        self.keep_images = keep;
        self
    }

    /// Use another encoder binary.
    #[must_use]
    pub fn with_ffmpeg(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffmpeg = program.into();
        self
    }

    /// Set the output file name.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(fps) = self.frame_rate {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ExtractError::validation(
                    "frame_rate",
                    format!("{fps} is not a positive frame rate"),
                ));
            }
        }
        if let Some(scale) = self.scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ExtractError::validation(
                    "scale",
                    format!("{scale} is not a positive factor"),
                ));
            }
        }
        if self.output_name.is_empty() {
            return Err(ExtractError::validation("output_name", "empty file name"));
        }
        Ok(())
    }
}

/// Frames of a folder: the sorted `*.jpg` files, or the sorted `*.png`
/// files when there is no JPEG.
pub fn list_frames(folder: &Path) -> Result<Vec<PathBuf>> {
    for extension in FRAME_EXTENSIONS {
        let mut frames: Vec<PathBuf> = fs::read_dir(folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == extension))
            .collect();
        if !frames.is_empty() {
            frames.sort();
            return Ok(frames);
        }
    }
    Ok(Vec::new())
}

/// Frame rate stored in a topic folder's manifest, rounded to 2 decimals.
pub fn manifest_frame_rate(folder: &Path) -> Result<f64> {
    let manifest = read_manifest(folder)?;
    let frequency = manifest.topic.frequency.ok_or_else(|| {
        ExtractError::validation(
            "frame_rate",
            format!("manifest of topic {} has no frequency", manifest.topic.topic),
        )
    })?;
    Ok((frequency * 100.0).round() / 100.0)
}

/// Arguments passed to ffmpeg.
pub fn ffmpeg_args(folder: &Path, extension: &str, fps: f64, options: &VideoOptions) -> Vec<OsString> {
    let scale = options.scale.unwrap_or(1.0);
    let pattern = format!("{}/*.{extension}", glob_escape(folder));
    let output = folder.join(&options.output_name);

    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-framerate"]
        .map(OsString::from)
        .to_vec();
    args.push(fps.to_string().into());
    args.extend(["-pattern_type", "glob", "-i"].map(OsString::from));
    args.push(pattern.into());
    // libx264 needs even dimensions
    args.push("-vf".into());
    args.push(format!("scale=trunc(iw*{scale}/2)*2:trunc(ih*{scale}/2)*2:flags=lanczos").into());
    args.extend(["-vcodec", "libx264", "-pix_fmt", "yuv420p"].map(OsString::from));
    args.push(output.into_os_string());
    args
}

/// Escape glob metacharacters so ffmpeg matches the folder literally.
fn glob_escape(folder: &Path) -> String {
    let mut escaped = String::new();
    for c in folder.to_string_lossy().chars() {
        if matches!(c, '[' | ']' | '*' | '?' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Encode the frames of `folder` into a video inside the same folder.
///
/// Returns the video path, or `None` when the folder holds no frames.
pub fn assemble_video(folder: &Path, options: &VideoOptions) -> Result<Option<PathBuf>> {
    options.validate()?;
    if !folder.is_dir() {
        return Err(ExtractError::not_found(
            folder.display().to_string(),
            "not a directory",
        ));
    }

    let frames = list_frames(folder)?;
    let Some(extension) = frames
        .first()
        .and_then(|f| f.extension())
        .map(|e| e.to_string_lossy().to_string())
    else {
        warn!(folder = %folder.display(), "No images found, skipping video");
        return Ok(None);
    };

    let fps = match options.frame_rate {
        Some(fps) => fps,
        None => manifest_frame_rate(folder)?,
    };
    if fps <= 0.0 {
        return Err(ExtractError::validation(
            "frame_rate",
            format!("{fps} is not a positive frame rate"),
        ));
    }

    let args = ffmpeg_args(folder, &extension, fps, options);
    let program = options.ffmpeg.display().to_string();
    debug!(program = %program, ?args, "Running encoder");

    let output = Command::new(&options.ffmpeg)
        .args(&args)
        .output()
        .map_err(|e| ExtractError::subprocess(&program, e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::subprocess(
            &program,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    if !options.keep_images {
        for frame in &frames {
            fs::remove_file(frame)?;
        }
        debug!(count = frames.len(), "Deleted frames");
    }

    let video = folder.join(&options.output_name);
    info!(video = %video.display(), frames = frames.len(), fps, "Assembled video");
    Ok(Some(video))
}
