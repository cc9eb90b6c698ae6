// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Clip command - copy a slice of a bag.

use std::path::PathBuf;

use bagframes::clip::{clip_bag, ClipOptions, TimestampKind};
use bagframes::extract::parse_topics;
use bagframes::io::Compression;
use clap::Args;

use crate::common::Result;

/// Copy a time and topic slice into a new bag.
#[derive(Args, Clone, Debug)]
pub struct ClipCmd {
    /// Input bag
    #[arg(short, long, value_name = "INPUT")]
    input: PathBuf,

    /// Output bag
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Topics to keep, comma separated (default: all)
    #[arg(short, long)]
    topics: Option<String>,

    /// First time to keep
    #[arg(long)]
    start: Option<String>,

    /// Last time to keep
    #[arg(long)]
    end: Option<String>,

    /// How --start and --end are read: rosbag_ns or offset_s
    #[arg(long, default_value = "rosbag_ns")]
    timestamp_kind: TimestampKind,

    /// Output chunk compression: none, bz2 or lz4
    #[arg(long, default_value = "none")]
    compression: Compression,
}

impl ClipCmd {
    pub fn run(self) -> Result<()> {
        let window = self
            .timestamp_kind
            .window(self.start.as_deref(), self.end.as_deref())?;
        let mut options = ClipOptions::new()
            .with_window(window)
            .with_compression(self.compression);
        if let Some(topics) = &self.topics {
            options = options.with_topics(parse_topics(topics));
        }

        let stats = clip_bag(&self.input, &self.output, &options)?;
        println!(
            "Wrote {} of {} message(s) on {} connection(s) to {}",
            stats.messages_written,
            stats.messages_read,
            stats.connection_count,
            self.output.display()
        );
        Ok(())
    }
}
