//! Common utility functions shared across CLI commands.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat};
use imprint_core::compare::RegisteredOriginal;
use imprint_core::{AnalysisProfile, PixelBuffer};
use tracing::{debug, info};

use crate::OutputFormat;

/// Environment variable naming a profile file when `--profile` is absent.
pub const PROFILE_ENV: &str = "IMPRINT_PROFILE";

/// Build the registration record path from an image path.
///
/// Transforms `file.ext` into `file.ext.imprint`.
pub fn build_record_path(file: &Path) -> PathBuf {
    file.with_extension(format!(
        "{}.imprint",
        file.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    ))
}

/// Default output path for a watermarked copy: `photo.jpg` becomes
/// `photo.imprinted.png` next to it.
pub fn build_marked_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    file.with_file_name(format!("{stem}.imprinted.png"))
}

/// Read a whole input file.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Decode image bytes into an RGBA pixel buffer.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer> {
    let image = image::load_from_memory(bytes).context("Failed to decode image")?;
    debug!(width = image.width(), height = image.height(), "Decoded image");
    PixelBuffer::from_image(&image).context("Failed to decode image")
}

/// Encode pixels as PNG in memory.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels.to_rgba_image())
        .write_to(&mut buffer, ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(buffer.into_inner())
}

/// Serialize a registration record and write it to disk.
pub fn save_record(path: &Path, record: &RegisteredOriginal, format: OutputFormat) -> Result<()> {
    let bytes = match format {
        OutputFormat::Json => {
            serde_json::to_vec_pretty(record).context("Failed to serialize record to JSON")?
        }
        OutputFormat::Cbor => {
            let mut out = Vec::new();
            ciborium::into_writer(record, &mut out)
                .context("Failed to serialize record to CBOR")?;
            out
        }
    };
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write record: {}", path.display()))?;
    debug!(format = ?format, path = %path.display(), "Saved record");
    Ok(())
}

/// Load and parse a registration record, trying CBOR first then JSON.
pub fn load_record(path: &Path) -> Result<RegisteredOriginal> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read record file: {}", path.display()))?;

    let record = if let Ok(record) = ciborium::from_reader::<RegisteredOriginal, _>(bytes.as_slice())
    {
        debug!(format = "cbor", "Parsed record");
        record
    } else if let Ok(record) = serde_json::from_slice(&bytes) {
        debug!(format = "json", "Parsed record");
        record
    } else {
        bail!("Failed to parse record file (tried CBOR and JSON)");
    };

    Ok(record)
}

/// Resolve the analysis profile from `--profile`, then `IMPRINT_PROFILE`,
/// then the built-in defaults.
pub fn load_profile(explicit: Option<&Path>) -> Result<AnalysisProfile> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PROFILE_ENV).map(PathBuf::from));

    let Some(path) = path else {
        return Ok(AnalysisProfile::default());
    };

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read profile: {}", path.display()))?;
    let profile = AnalysisProfile::from_json(&json)
        .with_context(|| format!("Invalid profile: {}", path.display()))?;
    info!(path = %path.display(), version = %profile.version, "Loaded profile");
    Ok(profile)
}

/// Parse a `LAT,LON` flag value.
pub fn parse_gps(value: &str) -> Result<imprint_core::GpsPoint> {
    value
        .parse()
        .with_context(|| format!("Invalid argument: --gps {value}"))
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_record_path() {
        assert_eq!(
            build_record_path(Path::new("image.png")),
            PathBuf::from("image.png.imprint")
        );
        assert_eq!(
            build_record_path(Path::new("noext")),
            PathBuf::from("noext.bin.imprint")
        );
    }

    #[test]
    fn test_build_marked_path() {
        assert_eq!(
            build_marked_path(Path::new("dir/photo.jpg")),
            PathBuf::from("dir/photo.imprinted.png")
        );
    }

    #[test]
    fn test_parse_gps() {
        let point = parse_gps("12.34,56.78").unwrap();
        assert_eq!(point.latitude, 12.34);
        assert_eq!(point.longitude, 56.78);
        let err = parse_gps("north").unwrap_err();
        assert!(format!("{err:#}").contains("Invalid argument"));
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-15 12:30:45.123 UTC
        let formatted = format_timestamp(1705321845123);
        assert!(formatted.contains("2024-01-15"));
        assert!(formatted.contains("UTC"));
    }

    #[test]
    fn test_record_roundtrip_both_formats() {
        let dir = std::env::temp_dir().join(format!("imprint-utils-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let pixels = PixelBuffer::filled(16, 16, [1, 2, 3, 255]).unwrap();
        let record = RegisteredOriginal::register(b"bytes", Some(&pixels), Some("user-42"));

        for format in [OutputFormat::Cbor, OutputFormat::Json] {
            let path = dir.join(format!("record-{format:?}.imprint"));
            save_record(&path, &record, format).unwrap();
            assert_eq!(load_record(&path).unwrap(), record);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
