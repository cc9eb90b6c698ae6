// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagframes CLI
//!
//! Command-line tool for pulling images and metadata out of ROS1 bags.
//!
//! ## Usage
//!
//! ```sh
//! # Extract every image topic as JPEG
//! bagframes images -i drive.bag -o frames
//!
//! # Every 5th frame of one topic between 2 s and 30 s, resized
//! bagframes images -i drive.bag -o frames -t /camera/image_raw \
//!     --sample 5 --start-time 2 --end-time 30 --resize 640,480
//!
//! # Metadata of all bags in a folder
//! bagframes summary -i recordings -o recordings/metadata.json
//!
//! # Cut a slice out of a bag
//! bagframes clip -i drive.bag -o slice.bag --start 10 --end 20 --timestamp-kind offset_s
//!
//! # Encode an extracted topic folder
//! bagframes video -i frames/camera_image_raw
//! ```

mod cmd;
mod common;

use std::process;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{ClipCmd, ImagesCmd, SummaryCmd, VideoCmd};
use common::Result;

/// Bagframes - ROS1 bag image extraction
///
/// Extract images with manifests, summarize bags, clip bags and turn
/// extracted frames into videos.
#[derive(Parser, Clone)]
#[command(name = "bagframes")]
#[command(about = "Extract images, manifests, clips and videos from ROS1 bag files", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Extract images and manifests from image topics
    Images(ImagesCmd),

    /// Write bag metadata as JSON
    Summary(SummaryCmd),

    /// Copy a time and topic slice into a new bag
    Clip(ClipCmd),

    /// Encode an extracted topic folder into a video
    Video(VideoCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    match cli.command {
        Commands::Images(cmd) => cmd.run(),
        Commands::Summary(cmd) => cmd.run(),
        Commands::Clip(cmd) => cmd.run(),
        Commands::Video(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
