// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Video command - encode extracted frames.

use std::path::PathBuf;

use bagframes::video::{assemble_video, VideoOptions, DEFAULT_FFMPEG, DEFAULT_VIDEO_NAME};
use clap::Args;

use crate::common::Result;

/// Encode an extracted topic folder into a video.
#[derive(Args, Clone, Debug)]
pub struct VideoCmd {
    /// Topic folder holding frames and img_manifest.json
    #[arg(short, long, value_name = "FOLDER")]
    input: PathBuf,

    /// Video file name inside the folder
    #[arg(short, long, default_value = DEFAULT_VIDEO_NAME)]
    name: String,

    /// Frames per second (default: topic frequency from the manifest)
    #[arg(short, long)]
    frame_rate: Option<f64>,

    /// Scale factor for both dimensions
    #[arg(short, long)]
    scale: Option<f64>,

    /// Delete the frames after encoding
    #[arg(long)]
    delete_images: bool,

    /// Encoder program
    #[arg(long, default_value = DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,
}

impl VideoCmd {
    pub fn run(self) -> Result<()> {
        let mut options = VideoOptions::new()
            .with_output_name(self.name)
            .with_keep_images(!self.delete_images)
            .with_ffmpeg(self.ffmpeg);
        if let Some(fps) = self.frame_rate {
            options = options.with_frame_rate(fps);
        }
        if let Some(scale) = self.scale {
            options = options.with_scale(scale);
        }

        match assemble_video(&self.input, &options)? {
            Some(video) => println!("Wrote {}", video.display()),
            None => println!("No images in {}", self.input.display()),
        }
        Ok(())
    }
}
