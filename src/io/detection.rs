// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag file detection and input resolution.
//!
//! A path is accepted as a bag when it carries the `.bag` extension and the
//! file begins with the `#ROSBAG V` signature. Directories are scanned
//! recursively for such files.
//!
//! # Example
//!
//! ```rust,no_run
//! use bagframes::io::detection::resolve_inputs;
//!
//! for bag in resolve_inputs("recordings/")? {
//!     println!("{}", bag.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::core::{ExtractError, Result};

/// Conventional bag file extension.
pub const BAG_EXTENSION: &str = "bag";

/// Signature every ROS bag starts with (followed by the version).
pub const BAG_MAGIC: &[u8] = b"#ROSBAG V";

/// Check whether a path has the `.bag` extension.
pub fn is_bag_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BAG_EXTENSION))
}

/// Check whether the file content starts with the bag signature.
pub fn has_bag_magic<P: AsRef<Path>>(path: P) -> Result<bool> {
    let mut file = File::open(path.as_ref())?;
    let mut header = [0u8; 9];
    let mut read = 0;
    while read < header.len() {
        let n = file.read(&mut header[read..])?;
        if n == 0 {
            return Ok(false);
        }
        read += n;
    }
    Ok(header == BAG_MAGIC)
}

/// Validate that a path points at a readable bag file.
///
/// Returns [`ExtractError::NotFound`] when the path does not exist, lacks
/// the bag extension, or carries no bag signature.
pub fn ensure_bag_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if !path.is_file() {
        return Err(ExtractError::not_found(display, "file does not exist"));
    }
    if !is_bag_file(path) {
        return Err(ExtractError::not_found(display, "not a .bag file"));
    }
    match has_bag_magic(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ExtractError::not_found(display, "missing #ROSBAG signature")),
        Err(e) => Err(ExtractError::not_found(display, e.to_string())),
    }
}

/// Recursively collect `.bag` files below a directory, sorted by path.
pub fn find_bag_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_bag_files(dir.as_ref(), &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_bag_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_bag_files(&path, found)?;
        } else if is_bag_file(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Resolve an input path to the list of bags it designates.
///
/// A file must be a bag (see [`ensure_bag_file`]); a directory yields every
/// bag file below it. Bags found in a directory are not signature-checked
/// here so that a corrupt one is reported per bag instead of failing the
/// whole batch.
pub fn resolve_inputs<P: AsRef<Path>>(input: P) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();
    if input.is_dir() {
        find_bag_files(input)
    } else {
        ensure_bag_file(input)?;
        Ok(vec![input.to_path_buf()])
    }
}
