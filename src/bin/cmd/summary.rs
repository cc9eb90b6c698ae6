// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Summary command - write bag metadata as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bagframes::summary::{split_summary_path, summarize_path, BagSummary, DEFAULT_SUMMARY_FILE_NAME};
use clap::Args;

use crate::common::{format_duration, format_timestamp, write_json, Result};

/// Write bag metadata as JSON.
#[derive(Args, Clone, Debug)]
pub struct SummaryCmd {
    /// A bag file, or a folder searched recursively for bags
    #[arg(short, long, value_name = "INPUT")]
    input: PathBuf,

    /// Output folder or .json path (default: print to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// File name used when OUTPUT is a folder
    #[arg(short, long, default_value = DEFAULT_SUMMARY_FILE_NAME)]
    file_name: String,

    /// Write one {bag}.json per bag instead of a combined file
    #[arg(short, long)]
    split: bool,

    /// Prefix written file names with '.'
    #[arg(long)]
    hidden: bool,
}

impl SummaryCmd {
    pub fn run(self) -> Result<()> {
        let summaries = summarize_path(&self.input)?;

        if self.split {
            for (bag, summary) in &summaries {
                let path =
                    split_summary_path(bag, &self.input_root(), self.output.as_deref(), self.hidden);
                write_json(&path, summary)?;
                print_line(bag, summary.as_ref());
            }
            return Ok(());
        }

        let combined: BTreeMap<String, Option<BagSummary>> = summaries
            .iter()
            .map(|(bag, summary)| (bag.display().to_string(), summary.clone()))
            .collect();

        let Some(output) = &self.output else {
            println!("{}", serde_json::to_string_pretty(&combined)?);
            return Ok(());
        };

        let path = self.combined_path(output);
        write_json(&path, &combined)?;
        for (bag, summary) in &summaries {
            print_line(bag, summary.as_ref());
        }
        println!("Wrote {}", path.display());
        Ok(())
    }

    /// Absolute input folder, used to mirror bag directories.
    fn input_root(&self) -> PathBuf {
        std::fs::canonicalize(&self.input).unwrap_or_else(|_| self.input.clone())
    }

    fn combined_path(&self, output: &Path) -> PathBuf {
        let is_file = output.is_file() || output.extension().is_some_and(|e| e == "json");
        if is_file {
            return output.to_path_buf();
        }
        let name = if self.hidden {
            format!(".{}", self.file_name)
        } else {
            self.file_name.clone()
        };
        output.join(name)
    }
}

fn print_line(bag: &Path, summary: Option<&BagSummary>) {
    match summary {
        Some(s) => println!(
            "{}: {} topic(s), {} from {}",
            bag.display(),
            s.topics.len(),
            format_duration((s.duration.max(0.0) * 1e9) as u64),
            format_timestamp(s.start_time)
        ),
        None => println!("{}: unreadable", bag.display()),
    }
}
