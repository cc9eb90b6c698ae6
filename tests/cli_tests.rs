// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual bagframes binary and verify its behavior.

mod common;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use bagframes::io::{BagReader, TopicFilter};
use common::{sample_bag, temp_dir, BAG_START_NS, PERIOD_NS};

/// Run bagframes with arguments
fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bagframes"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run bagframes")
}

/// Run bagframes and assert success
fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run bagframes and assert failure
fn run_err(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        !output.status.success(),
        "Command should have failed: {:?}\nstdout: {}",
        args,
        String::from_utf8_lossy(&output.stdout)
    );
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let stdout = run_ok(&["--help"]);
    for command in ["images", "summary", "clip", "video"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_unknown_command_fails() {
    run_err(&["frobnicate"]);
}

// ============================================================================
// Images
// ============================================================================

#[test]
fn test_images_command() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 4);
    let out = dir.path().join("out");

    let stdout = run_ok(&[
        "images",
        "-i",
        path_str(&bag),
        "-o",
        path_str(&out),
        "-t",
        "/cam",
        "-f",
        "png",
        "--no-progress",
    ]);

    assert!(stdout.contains("Extracted 1 topic folder(s) from 1 bag(s)"));
    let folder = out.join("cam");
    assert!(folder.join("cam_000000.png").exists());
    assert!(folder.join("cam_000003.png").exists());
    assert!(folder.join("img_manifest.json").exists());
}

#[test]
fn test_images_with_config_file() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 6);
    let out = dir.path().join("from_config");
    let config = dir.path().join("extract.toml");
    fs::write(
        &config,
        format!(
            "[extract]\noutput_dir = {:?}\ntopics = [\"/cam\"]\nsample = 2\ncreate_manifest = false\n",
            path_str(&out)
        ),
    )
    .unwrap();

    run_ok(&[
        "images",
        "-i",
        path_str(&bag),
        "-c",
        path_str(&config),
        "--no-progress",
    ]);

    let mut files: Vec<String> = fs::read_dir(out.join("cam"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files, vec!["cam_000000.jpg", "cam_000002.jpg", "cam_000004.jpg"]);
}

#[test]
fn test_images_requires_output() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 1);
    let stderr = run_err(&["images", "-i", path_str(&bag)]);
    assert!(stderr.contains("--output"));
}

#[test]
fn test_images_rejects_bad_resize() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 1);
    let out = dir.path().join("out");
    let stderr = run_err(&[
        "images",
        "-i",
        path_str(&bag),
        "-o",
        path_str(&out),
        "-r",
        "640",
    ]);
    assert!(stderr.contains("resize"));
    assert!(!out.exists());
}

#[test]
fn test_images_missing_input() {
    let dir = temp_dir();
    let stderr = run_err(&[
        "images",
        "-i",
        path_str(&dir.path().join("missing.bag")),
        "-o",
        path_str(dir.path()),
    ]);
    assert!(stderr.contains("Not found"));
}

// ============================================================================
// Summary
// ============================================================================

#[test]
fn test_summary_to_stdout() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 5);

    let stdout = run_ok(&["summary", "-i", path_str(&bag)]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    let key = fs::canonicalize(&bag).unwrap().display().to_string();
    let summary = &json[key.as_str()];
    assert_eq!(summary["file_name"], "drive.bag");
    assert_eq!(summary["topics"].as_array().unwrap().len(), 3);
}

#[test]
fn test_summary_split_mirrors_folders() {
    let dir = temp_dir();
    let input = dir.path().join("bags");
    fs::create_dir_all(input.join("day1")).unwrap();
    sample_bag(&input, "a.bag", 2);
    sample_bag(&input.join("day1"), "b.bag", 2);
    let out = dir.path().join("summaries");

    run_ok(&[
        "summary",
        "-i",
        path_str(&input),
        "-o",
        path_str(&out),
        "--split",
        "--hidden",
    ]);

    assert!(out.join(".a.bag.json").exists());
    let nested: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("day1").join(".b.bag.json")).unwrap())
            .unwrap();
    assert_eq!(nested["file_name"], "b.bag");
}

#[test]
fn test_summary_combined_file() {
    let dir = temp_dir();
    sample_bag(dir.path(), "a.bag", 2);
    let out = dir.path().join("meta");

    run_ok(&["summary", "-i", path_str(dir.path()), "-o", path_str(&out)]);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("rosbag_metadata.json")).unwrap())
            .unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
}

// ============================================================================
// Clip
// ============================================================================

#[test]
fn test_clip_command() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 10);
    let out = dir.path().join("clip.bag");
    let start = (BAG_START_NS + 2 * PERIOD_NS).to_string();
    let end = (BAG_START_NS + 5 * PERIOD_NS).to_string();

    let stdout = run_ok(&[
        "clip",
        "-i",
        path_str(&bag),
        "-o",
        path_str(&out),
        "-t",
        "/cam",
        "--start",
        &start,
        "--end",
        &end,
        "--compression",
        "bz2",
    ]);
    assert!(stdout.contains("Wrote 4 of"));

    let reader = BagReader::open(&out).unwrap();
    assert_eq!(reader.messages(&TopicFilter::All).count(), 4);
    assert_eq!(reader.start_time(), BAG_START_NS + 2 * PERIOD_NS);
}

#[test]
fn test_clip_rejects_bad_timestamp() {
    let dir = temp_dir();
    let bag = sample_bag(dir.path(), "drive.bag", 2);
    let out = dir.path().join("clip.bag");
    run_err(&[
        "clip",
        "-i",
        path_str(&bag),
        "-o",
        path_str(&out),
        "--start",
        "soon",
    ]);
    assert!(!out.exists());
}
