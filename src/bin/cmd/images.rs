// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Images command - extract image topics to files.

use std::path::PathBuf;

use anyhow::bail;
use bagframes::extract::{
    extract_images, parse_resize, parse_topics, ExtractionConfig, NamingScheme, SampleStride,
};
use clap::Args;

use crate::common::{progress_enabled, Result};

/// Extract images and manifests from image topics.
#[derive(Args, Clone, Debug)]
pub struct ImagesCmd {
    /// A bag file, or a folder searched recursively for bags
    #[arg(short, long, value_name = "INPUT")]
    input: PathBuf,

    /// Output folder (required unless set in --config)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// TOML file with an [extract] table; flags override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Topics to extract, comma separated (default: all image topics)
    #[arg(short, long)]
    topics: Option<String>,

    /// Image file format (jpg, png, ...)
    #[arg(short, long)]
    format: Option<String>,

    /// File naming: sequential, rosbag_timestamp or msg_timestamp
    #[arg(short, long)]
    naming: Option<NamingScheme>,

    /// Resize frames to width,height
    #[arg(short, long, value_name = "WIDTH,HEIGHT")]
    resize: Option<String>,

    /// Keep every N-th message per topic
    #[arg(short, long, value_name = "N")]
    sample: Option<u32>,

    /// Seconds after the bag start to begin at
    #[arg(long, value_name = "SECONDS")]
    start_time: Option<f64>,

    /// Seconds after the bag start to stop at
    #[arg(long, value_name = "SECONDS")]
    end_time: Option<f64>,

    /// Do not write img_manifest.json files
    #[arg(long)]
    no_manifest: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl ImagesCmd {
    pub fn run(self) -> Result<()> {
        let config = self.build_config()?;
        config.validate()?;

        let results = extract_images(&self.input, &config)?;

        let mut folders = 0;
        for result in &results {
            if result.folders.is_empty() {
                println!("{}: no images", result.bag.display());
                continue;
            }
            println!("{}:", result.bag.display());
            for folder in &result.folders {
                println!("  {}", folder.display());
            }
            folders += result.folders.len();
        }
        println!("Extracted {folders} topic folder(s) from {} bag(s)", results.len());
        Ok(())
    }

    fn build_config(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_toml_file(path)?,
            None => ExtractionConfig::default(),
        };

        match &self.output {
            Some(output) => config.output_dir = output.clone(),
            None if self.config.is_none() => bail!("--output is required without --config"),
            None => {}
        }
        if let Some(topics) = &self.topics {
            config.topics = parse_topics(topics);
        }
        if let Some(format) = &self.format {
            config.file_format = format.trim_start_matches('.').to_string();
        }
        if let Some(naming) = self.naming {
            config.naming = naming;
        }
        if let Some(resize) = &self.resize {
            config.resize = Some(parse_resize(resize)?);
        }
        if let Some(sample) = self.sample {
            config.sample = Some(SampleStride::new(sample)?);
        }
        if self.start_time.is_some() {
            config.window.start = self.start_time;
        }
        if self.end_time.is_some() {
            config.window.end = self.end_time;
        }
        if self.no_manifest {
            config.create_manifest = false;
        }
        config.show_progress = progress_enabled(!self.no_progress);

        Ok(config)
    }
}
