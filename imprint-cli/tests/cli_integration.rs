//! CLI integration tests for imprint-cli.
//!
//! These tests run the actual binary and check outputs, exit codes and the
//! files it writes.

use assert_cmd::Command;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the imprint binary.
fn imprint() -> Command {
    let mut cmd = Command::cargo_bin("imprint").unwrap();
    cmd.env_remove("IMPRINT_PROFILE").env_remove("RUST_LOG");
    cmd
}

fn scene() -> RgbImage {
    RgbImage::from_fn(160, 120, |x, y| {
        Rgb([
            (x * 255 / 160) as u8,
            (y * 255 / 120) as u8,
            ((x + y) % 200) as u8,
        ])
    })
}

/// Write the test scene as PNG and return its path.
fn write_png(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(img.clone())
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

/// Embed into `photo.png` and return (marked image, record) paths.
fn embed_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let photo = write_png(dir, "photo.png", &scene());
    imprint()
        .args([
            "embed",
            "--subject",
            "user-42",
            "--gps",
            "12.34,56.78",
            photo.to_str().unwrap(),
        ])
        .assert()
        .success();
    let marked = dir.join("photo.imprinted.png");
    let record = dir.join("photo.imprinted.png.imprint");
    (marked, record)
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    imprint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Image provenance and tamper forensics"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("classify"));
}

#[test]
fn test_version_displays_version() {
    imprint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("imprint"));
}

#[test]
fn test_help_shows_exit_codes() {
    imprint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_embed_help_shows_options() {
    imprint()
        .args(["embed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--subject"))
        .stdout(predicate::str::contains("--gps"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--format"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_missing_file_returns_input_error() {
    // Exit code 66 = EX_NOINPUT
    imprint()
        .args(["hash", "nonexistent_file.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_undecodable_image_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("broken.png");
    fs::write(&file, b"not an image").unwrap();

    imprint()
        .args(["extract", file.to_str().unwrap()])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to decode image"));
}

#[test]
fn test_invalid_gps_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    imprint()
        .args([
            "embed",
            "--subject",
            "user-42",
            "--gps",
            "somewhere",
            photo.to_str().unwrap(),
        ])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_overlong_subject_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());
    let subject = "s".repeat(240);

    imprint()
        .args([
            "embed",
            "--subject",
            subject.as_str(),
            "--gps",
            "12.34,56.78",
            photo.to_str().unwrap(),
        ])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Payload too long"));
    assert!(!temp.path().join("photo.imprinted.png").exists());
}

#[test]
fn test_missing_record_returns_input_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    imprint()
        .args(["compare", photo.to_str().unwrap(), "missing.imprint"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read record file"));
}

#[test]
fn test_invalid_record_returns_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());
    let record = temp.path().join("photo.png.imprint");
    fs::write(&record, b"invalid record data").unwrap();

    imprint()
        .args(["compare", photo.to_str().unwrap(), record.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse record"));
}

// ============================================================================
// Embed, Extract and Compare Roundtrips
// ============================================================================

#[test]
fn test_embed_writes_image_and_record() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());

    assert!(marked.exists(), "Watermarked image should be created");
    assert!(record.exists(), "Record should be created");
    // CBOR record is binary, not JSON
    assert!(!fs::read(&record).unwrap().starts_with(b"{"));
}

#[test]
fn test_embed_with_json_record() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());
    let output = temp.path().join("out.png");

    imprint()
        .args([
            "embed",
            "--subject",
            "user-42",
            "--format",
            "json",
            "--output",
            output.to_str().unwrap(),
            photo.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Identity payload embedded"));

    let record = fs::read_to_string(temp.path().join("out.png.imprint")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&record).unwrap();
    assert_eq!(value["subject_id"], "user-42");
    assert_eq!(value["dimensions"], serde_json::json!([160, 120]));
}

#[test]
fn test_extract_recovers_payload() {
    let temp = TempDir::new().unwrap();
    let (marked, _) = embed_fixture(temp.path());

    imprint()
        .args(["extract", marked.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("user-42"))
        .stdout(predicate::str::contains("12.34,56.78"))
        .stdout(predicate::str::contains("very high"));
}

#[test]
fn test_extract_json_output() {
    let temp = TempDir::new().unwrap();
    let (marked, _) = embed_fixture(temp.path());

    let output = imprint()
        .args(["--json", "extract", marked.to_str().unwrap()])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["payload"]["subject_id"], "user-42");
    assert_eq!(value["confidence"], "VeryHigh");
}

#[test]
fn test_extract_without_payload_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "plain.png", &scene());

    // Exit code 65 = EX_DATAERR
    imprint()
        .args(["extract", photo.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("No identity payload"));
}

#[test]
fn test_compare_exact_copy_not_tampered() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());

    imprint()
        .args(["compare", marked.to_str().unwrap(), record.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT TAMPERED"))
        .stdout(predicate::str::contains("100%"));
}

/// Paint the top-left quarter of the marked image red.
fn write_edited(marked: &Path) -> PathBuf {
    let mut img = image::open(marked).unwrap().to_rgb8();
    for y in 0..60 {
        for x in 0..80 {
            img.put_pixel(x, y, Rgb([255, 0, 0]));
        }
    }
    write_png(marked.parent().unwrap(), "edited.png", &img)
}

#[test]
fn test_compare_edited_copy_tampered() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());
    let edited = write_edited(&marked);

    // Exit code 65 = EX_DATAERR
    imprint()
        .args(["compare", edited.to_str().unwrap(), record.to_str().unwrap()])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("TAMPERED"))
        .stdout(predicate::str::contains("top-left"));
}

#[test]
fn test_compare_json_verdict() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());
    let edited = write_edited(&marked);

    let output = imprint()
        .args([
            "--json",
            "compare",
            edited.to_str().unwrap(),
            record.to_str().unwrap(),
        ])
        .assert()
        .code(65);
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["is_tampered"], true);
    assert_eq!(value["profile_version"], "2024.1");
}

// ============================================================================
// Profile Tests
// ============================================================================

#[test]
fn test_profile_flag_changes_verdict() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());
    let edited = write_edited(&marked);
    let profile = temp.path().join("lenient.json");
    fs::write(
        &profile,
        r#"{ "version": "lenient-1", "verdict": { "tamper_score": 1000 } }"#,
    )
    .unwrap();

    imprint()
        .args([
            "--profile",
            profile.to_str().unwrap(),
            "compare",
            edited.to_str().unwrap(),
            record.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT TAMPERED"))
        .stdout(predicate::str::contains("lenient-1"));
}

#[test]
fn test_profile_from_environment() {
    let temp = TempDir::new().unwrap();
    let (marked, record) = embed_fixture(temp.path());
    let edited = write_edited(&marked);
    let profile = temp.path().join("lenient.json");
    fs::write(&profile, r#"{ "verdict": { "tamper_score": 1000 } }"#).unwrap();

    imprint()
        .env("IMPRINT_PROFILE", &profile)
        .args(["compare", edited.to_str().unwrap(), record.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_invalid_profile_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());
    let profile = temp.path().join("broken.json");
    fs::write(&profile, "{ not json").unwrap();

    imprint()
        .args(["--profile", profile.to_str().unwrap(), "hash", photo.to_str().unwrap()])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Invalid profile"));
}

#[test]
fn test_missing_profile_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());
    let profile = temp.path().join("absent.json");

    imprint()
        .args(["--profile", profile.to_str().unwrap(), "hash", photo.to_str().unwrap()])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Failed to read profile"));
}

// ============================================================================
// Hash, Inspect and Classify
// ============================================================================

#[test]
fn test_hash_prints_digest_and_fingerprint() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    let output = imprint()
        .args(["--json", "hash", photo.to_str().unwrap()])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["digest"].as_str().unwrap().len(), 64);
    assert_eq!(value["fingerprint"].as_str().unwrap().len(), 16);
}

#[test]
fn test_hash_of_non_image_has_no_fingerprint() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.txt");
    fs::write(&file, b"hello").unwrap();

    imprint()
        .args(["hash", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn test_inspect_reports_editor_comment() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("edited.jpg");
    let comment = b"Edited in GIMP";
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xFE];
    jpeg.extend_from_slice(&((comment.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(comment);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    fs::write(&file, jpeg).unwrap();

    imprint()
        .args(["inspect", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jpeg container"))
        .stdout(predicate::str::contains("GIMP"));
}

#[test]
fn test_classify_json_output() {
    let temp = TempDir::new().unwrap();
    let (marked, _) = embed_fixture(temp.path());

    let output = imprint()
        .args(["--json", "classify", marked.to_str().unwrap()])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["case"], "watermarked");
    assert!(value["confidence"].as_u64().unwrap() <= 100);
}

// ============================================================================
// Quiet and Color Tests
// ============================================================================

#[test]
fn test_quiet_mode_minimal_output() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    let output = imprint()
        .args(["--quiet", "inspect", photo.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(
        stdout.trim().is_empty(),
        "Quiet mode should have no stdout, got: {}",
        stdout
    );
}

#[test]
fn test_color_never_no_ansi() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    let output = imprint()
        .args(["--color=never", "inspect", photo.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let stderr = String::from_utf8_lossy(&output.get_output().stderr);
    assert!(!stdout.contains("\x1b["), "stdout should not contain ANSI codes");
    assert!(!stderr.contains("\x1b["), "stderr should not contain ANSI codes");
}

#[test]
fn test_conflicting_verbose_quiet_rejected() {
    let temp = TempDir::new().unwrap();
    let photo = write_png(temp.path(), "photo.png", &scene());

    imprint()
        .args(["--verbose", "--quiet", "hash", photo.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
