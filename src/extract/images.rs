// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Image extraction from ROS1 bags.
//!
//! One pass over the bag's record stream. Every record on a selected topic
//! goes through:
//!
//! ```text
//! RECEIVE -> out of window  -> counter += 1
//!         -> sampled out    -> counter += 1
//!         -> decode, materialize, resize, write, manifest, counter += 1
//! ```
//!
//! The per-topic counter is both the stride index and the sequential file
//! index, so a frame's name never depends on the filters in effect.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use super::config::ExtractionConfig;
use super::manifest::{ManifestEntry, TopicManifest};
use super::naming::{image_file_name, msg_timestamp, topic_folder_name};
use super::window::estimate_frames;
use crate::core::{ExtractError, Result, NANOS_PER_SEC};
use crate::encoding::{decode_message, MessageSchema};
use crate::imaging::{materialize, resize, save_image};
use crate::io::detection::{ensure_bag_file, find_bag_files};
use crate::io::filter::TopicFilter;
use crate::io::formats::bag::BagReader;
use crate::io::metadata::{Connection, RawRecord, TopicInfo};

/// Extraction state of one topic.
#[derive(Debug)]
pub struct TopicState {
    /// Messages considered so far, kept or skipped
    pub counter: u64,
    /// Images written so far
    pub written: u64,
    /// Entries collected for the topic manifest
    pub manifest: TopicManifest,
    /// Output folder of the topic
    pub folder: PathBuf,
}

impl TopicState {
    fn new(info: TopicInfo, output_dir: &Path) -> Self {
        let folder = output_dir.join(topic_folder_name(&info.topic));
        Self {
            counter: 0,
            written: 0,
            manifest: TopicManifest::new(info),
            folder,
        }
    }
}

/// Result of extracting one bag in batch mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BagExtraction {
    /// Input bag
    pub bag: PathBuf,
    /// Topic folders that received at least one image
    pub folders: Vec<PathBuf>,
}

/// Extract images from one bag into `config.output_dir`.
///
/// Returns the folders of topics that received at least one image. A bag
/// whose records cannot be parsed is logged and yields no folders.
pub fn extract_images_from_bag(bag: &Path, config: &ExtractionConfig) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let format = config.image_format()?;

    let reader = match BagReader::open(bag) {
        Ok(reader) => reader,
        Err(e) if e.is_corrupt_container() => {
            warn!(bag = %bag.display(), error = %e, "Skipping unreadable bag");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let topics = resolve_topics(reader.connections(), &config.topics)?;
    if topics.is_empty() {
        warn!(bag = %bag.display(), "No image topics to extract");
        return Ok(Vec::new());
    }

    let topic_infos = match reader.topic_infos() {
        Ok(infos) => infos,
        Err(e) if e.is_corrupt_container() => {
            warn!(bag = %bag.display(), error = %e, "Skipping bag with unreadable index");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut states: BTreeMap<String, TopicState> = topics
        .iter()
        .filter_map(|topic| topic_infos.get(topic))
        .map(|info| {
            (
                info.topic.clone(),
                TopicState::new(info.clone(), &config.output_dir),
            )
        })
        .collect();

    let bag_start_ns = reader.start_time();
    let bag_start_s = bag_start_ns as f64 / NANOS_PER_SEC as f64;
    let bag_end_s = reader.end_time() as f64 / NANOS_PER_SEC as f64;
    let total: u64 = states.values().map(|s| s.manifest.topic.message_count).sum();
    let expected = estimate_frames(total, &config.window, bag_start_s, bag_end_s, config.sample);
    info!(
        bag = %bag.display(),
        topics = states.len(),
        expected,
        "Extracting images"
    );
    let progress = progress_bar(expected, config.show_progress);

    let filter = TopicFilter::include(states.keys().cloned());
    for item in reader.messages(&filter) {
        let (conn, record) = item?;
        let Some(state) = states.get_mut(&record.topic) else {
            continue;
        };

        let elapsed = record.elapsed_secs(bag_start_ns);
        if !config.window.should_keep(elapsed) {
            state.counter += 1;
            continue;
        }
        if let Some(stride) = config.sample {
            if !stride.keeps(state.counter) {
                state.counter += 1;
                continue;
            }
        }

        process_record(state, &conn, &record, config, format)?;
        state.counter += 1;
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut folders = Vec::new();
    for state in states.values() {
        if state.written == 0 {
            debug!(topic = %state.manifest.topic.topic, "No images written");
            continue;
        }
        if config.create_manifest {
            state.manifest.write_if_absent(&state.folder)?;
        }
        info!(
            topic = %state.manifest.topic.topic,
            images = state.written,
            folder = %state.folder.display(),
            "Extracted topic"
        );
        folders.push(state.folder.clone());
    }

    Ok(folders)
}

/// Extract images from a bag, or from every bag below a directory.
///
/// In directory mode each bag writes to `{output_dir}/{relative_dir}/{bag_stem}/`,
/// where `relative_dir` is the bag's directory below `input`. A failing bag
/// is logged and reported with no folders.
pub fn extract_images(input: &Path, config: &ExtractionConfig) -> Result<Vec<BagExtraction>> {
    config.validate()?;

    if !input.is_dir() {
        ensure_bag_file(input)?;
        let folders = extract_images_from_bag(input, config)?;
        return Ok(vec![BagExtraction {
            bag: input.to_path_buf(),
            folders,
        }]);
    }

    let bags = find_bag_files(input)?;
    if bags.is_empty() {
        warn!(dir = %input.display(), "No bag files found");
    }

    let mut results = Vec::with_capacity(bags.len());
    for bag in bags {
        let bag_config = config
            .clone()
            .with_output_dir(bag_output_dir(&bag, input, &config.output_dir));

        let folders = match extract_images_from_bag(&bag, &bag_config) {
            Ok(folders) => folders,
            Err(e) => {
                error!(bag = %bag.display(), error = %e, fields = ?e.log_fields(), "Extraction failed");
                Vec::new()
            }
        };
        results.push(BagExtraction { bag, folders });
    }
    Ok(results)
}

/// Output folder of one bag in directory mode.
fn bag_output_dir(bag: &Path, input_root: &Path, output: &Path) -> PathBuf {
    let stem = bag.file_stem().unwrap_or_default();
    let relative = bag
        .parent()
        .and_then(|dir| dir.strip_prefix(input_root).ok())
        .unwrap_or(Path::new(""));
    output.join(relative).join(stem)
}

/// Pick the topics to extract.
///
/// Requested topics missing from the bag are skipped with a warning. A
/// requested topic that is not an image type is an error. Without a
/// request every image topic is selected.
fn resolve_topics(connections: &[Connection], requested: &[String]) -> Result<Vec<String>> {
    let types: BTreeMap<&str, &str> = connections
        .iter()
        .map(|c| (c.topic.as_str(), c.message_type.as_str()))
        .collect();

    if requested.is_empty() {
        return Ok(types
            .into_iter()
            .filter(|(_, ty)| MessageSchema::is_image_type(ty))
            .map(|(topic, _)| topic.to_string())
            .collect());
    }

    let mut topics = Vec::new();
    for topic in requested {
        match types.get(topic.as_str()) {
            None => warn!(topic = %topic, "Requested topic not in bag"),
            Some(ty) if !MessageSchema::is_image_type(ty) => {
                return Err(ExtractError::unsupported_schema(*ty));
            }
            Some(_) if topics.contains(topic) => {}
            Some(_) => topics.push(topic.clone()),
        }
    }
    Ok(topics)
}

fn process_record(
    state: &mut TopicState,
    conn: &Connection,
    record: &RawRecord,
    config: &ExtractionConfig,
    format: ImageFormat,
) -> Result<()> {
    let message = decode_message(&conn.message_type, &record.data)?;
    let mut image = materialize(&message)?;
    if let Some(size) = config.resize {
        image = resize(&image, size);
    }

    let stamp = msg_timestamp(message.header().stamp)?;
    let stem = config.naming.stem(state.counter, record.time_ns, stamp);
    let path = state
        .folder
        .join(image_file_name(&record.topic, &stem, &config.file_format));

    if state.written == 0 {
        fs::create_dir_all(&state.folder).map_err(|e| {
            ExtractError::io(
                "output",
                format!("cannot create {}: {e}", state.folder.display()),
            )
        })?;
    }
    save_image(&image, &path, format)?;

    if config.create_manifest {
        state.manifest.insert(ManifestEntry::new(
            stamp,
            record.time_ns,
            &path,
            state.counter,
        ));
    }
    state.written += 1;
    Ok(())
}

fn progress_bar(total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    )
    .map(|s| s.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conns() -> Vec<Connection> {
        vec![
            Connection::new(0, "/cam", "sensor_msgs/Image"),
            Connection::new(1, "/cam", "sensor_msgs/Image"),
            Connection::new(2, "/depth", "sensor_msgs/CompressedImage"),
            Connection::new(3, "/imu", "sensor_msgs/Imu"),
        ]
    }

    #[test]
    fn test_bag_output_dir_mirrors_input_tree() {
        let root = Path::new("/data/bags");
        let out = Path::new("/out");
        assert_eq!(
            bag_output_dir(Path::new("/data/bags/a/drive.bag"), root, out),
            PathBuf::from("/out/a/drive")
        );
        assert_eq!(
            bag_output_dir(Path::new("/data/bags/drive.bag"), root, out),
            PathBuf::from("/out/drive")
        );
        assert_ne!(
            bag_output_dir(Path::new("/data/bags/a/drive.bag"), root, out),
            bag_output_dir(Path::new("/data/bags/b/drive.bag"), root, out)
        );
    }

    #[test]
    fn test_auto_topics_are_image_topics() {
        let topics = resolve_topics(&conns(), &[]).unwrap();
        assert_eq!(topics, vec!["/cam", "/depth"]);
    }

    #[test]
    fn test_missing_requested_topic_skipped() {
        let requested = vec!["/cam".to_string(), "/lidar".to_string(), "/cam".to_string()];
        let topics = resolve_topics(&conns(), &requested).unwrap();
        assert_eq!(topics, vec!["/cam"]);
    }

    #[test]
    fn test_requested_non_image_topic_rejected() {
        let requested = vec!["/imu".to_string()];
        assert!(matches!(
            resolve_topics(&conns(), &requested),
            Err(ExtractError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn test_topic_state_folder() {
        let state = TopicState::new(
            TopicInfo::new("/camera/left", "sensor_msgs/Image", 3),
            Path::new("out"),
        );
        assert_eq!(state.folder, Path::new("out").join("camera_left"));
        assert_eq!(state.counter, 0);
        assert!(state.manifest.is_empty());
    }
}
