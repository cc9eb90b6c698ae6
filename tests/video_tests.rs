// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Video assembly tests.
//!
//! ffmpeg is replaced by a shell script that records its arguments and
//! creates the output file, so these tests only run on Unix.

#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use bagframes::extract::{extract_images_from_bag, ExtractionConfig, MANIFEST_FILE_NAME};
use bagframes::video::{assemble_video, VideoOptions};
use bagframes::ExtractError;
use common::{sample_bag, temp_dir};

const FAKE_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
printf '%s\n' "$@" > "$(dirname "$last")/ffmpeg_args.txt"
: > "$last"
"#;

const FAILING_FFMPEG: &str = "#!/bin/sh\necho 'codec not found' >&2\nexit 3\n";

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Extract `/cam` as PNG frames and return its folder.
fn cam_folder(dir: &Path) -> PathBuf {
    let bag = sample_bag(dir, "drive.bag", 6);
    let config = ExtractionConfig::new(dir.join("out"))
        .with_topics(["/cam"])
        .with_file_format("png");
    let folders = extract_images_from_bag(&bag, &config).unwrap();
    assert_eq!(folders.len(), 1);
    folders[0].clone()
}

fn recorded_args(folder: &Path) -> Vec<String> {
    fs::read_to_string(folder.join("ffmpeg_args.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn count_png(folder: &Path) -> usize {
    fs::read_dir(folder)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == "png")
        })
        .count()
}

#[test]
fn test_video_uses_manifest_frame_rate() {
    let dir = temp_dir();
    let folder = cam_folder(dir.path());
    let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG);

    let video = assemble_video(&folder, &VideoOptions::new().with_ffmpeg(&ffmpeg))
        .unwrap()
        .unwrap();

    assert_eq!(video, folder.join("video.mp4"));
    assert!(video.exists());
    let args = recorded_args(&folder);
    let pos = args.iter().position(|a| a == "-framerate").unwrap();
    assert_eq!(args[pos + 1], "10");
    assert!(args.contains(&format!("{}/*.png", folder.display())));
    assert!(args.iter().any(|a| a.starts_with("scale=trunc(iw*1/2)*2")));
    assert_eq!(count_png(&folder), 6);
}

#[test]
fn test_explicit_rate_scale_and_cleanup() {
    let dir = temp_dir();
    let folder = cam_folder(dir.path());
    let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG);

    let options = VideoOptions::new()
        .with_ffmpeg(&ffmpeg)
        .with_frame_rate(24.0)
        .with_scale(0.5)
        .with_output_name("cam.mp4")
        .with_keep_images(false);
    let video = assemble_video(&folder, &options).unwrap().unwrap();

    assert_eq!(video, folder.join("cam.mp4"));
    let args = recorded_args(&folder);
    assert!(args.contains(&"24".to_string()));
    assert!(args.iter().any(|a| a.starts_with("scale=trunc(iw*0.5/2)*2")));
    assert_eq!(count_png(&folder), 0);
    assert!(folder.join(MANIFEST_FILE_NAME).exists());
}

#[test]
fn test_encoder_failure_is_reported() {
    let dir = temp_dir();
    let folder = cam_folder(dir.path());
    let ffmpeg = script(dir.path(), "ffmpeg", FAILING_FFMPEG);

    let options = VideoOptions::new()
        .with_ffmpeg(&ffmpeg)
        .with_keep_images(false);
    match assemble_video(&folder, &options) {
        Err(ExtractError::Subprocess { message, .. }) => {
            assert!(message.contains("codec not found"));
        }
        other => panic!("expected subprocess error, got {other:?}"),
    }
    // Frames survive a failed encode
    assert_eq!(count_png(&folder), 6);
}

#[test]
fn test_missing_encoder() {
    let dir = temp_dir();
    let folder = cam_folder(dir.path());
    let options = VideoOptions::new().with_ffmpeg(dir.path().join("no-such-ffmpeg"));
    assert!(matches!(
        assemble_video(&folder, &options),
        Err(ExtractError::Subprocess { .. })
    ));
}

#[test]
fn test_folder_without_frames() {
    let dir = temp_dir();
    let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG);
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();

    let result = assemble_video(&empty, &VideoOptions::new().with_ffmpeg(&ffmpeg)).unwrap();
    assert!(result.is_none());
    assert!(!empty.join("ffmpeg_args.txt").exists());
}

#[test]
fn test_frames_without_manifest_need_a_rate() {
    let dir = temp_dir();
    let ffmpeg = script(dir.path(), "ffmpeg", FAKE_FFMPEG);
    let folder = dir.path().join("loose");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("000000.jpg"), b"jpeg").unwrap();

    assert!(matches!(
        assemble_video(&folder, &VideoOptions::new().with_ffmpeg(&ffmpeg)),
        Err(ExtractError::NotFound { .. })
    ));
    let video = assemble_video(
        &folder,
        &VideoOptions::new().with_ffmpeg(&ffmpeg).with_frame_rate(5.0),
    )
    .unwrap();
    assert!(video.is_some());
}
