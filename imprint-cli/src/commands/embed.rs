//! Embed command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imprint_core::compare::RegisteredOriginal;
use imprint_core::{LsbCodec, Payload};
use serde_json::json;
use tracing::{debug, info};

use crate::utils::{
    build_marked_path, build_record_path, decode_image, encode_png, format_timestamp, parse_gps,
    print_json, read_input, save_record,
};
use crate::{OutputFormat, Session};

/// Execute the embed command.
pub fn execute(
    file: PathBuf,
    subject: String,
    gps: Option<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
    session: &Session,
) -> Result<()> {
    let gps = gps.as_deref().map(parse_gps).transpose()?;
    let payload = Payload::now(subject, gps).context("Invalid argument: payload rejected")?;

    let content = read_input(&file)?;
    let pixels = decode_image(&content)?;

    let codec = LsbCodec::new(session.profile.codec.clone());
    debug!(capacity = codec.segment_capacity(&pixels), "Segment capacity");
    let marked = codec
        .embed(&pixels, &payload)
        .context("Invalid argument: payload cannot be embedded")?;

    // The registered original is the PNG exactly as written.
    let png = encode_png(&marked)?;
    let output = output.unwrap_or_else(|| build_marked_path(&file));
    std::fs::write(&output, &png)
        .with_context(|| format!("Failed to write image: {}", output.display()))?;
    info!(path = %output.display(), bytes = png.len(), "Watermarked image saved");

    let record = RegisteredOriginal::register_with(
        &session.profile,
        &png,
        Some(&marked),
        Some(&payload.subject_id),
    );
    let record_path = build_record_path(&output);
    save_record(&record_path, &record, format)?;
    info!(path = %record_path.display(), "Record saved");

    if session.json {
        print_json(&json!({
            "image": output,
            "record": record_path,
            "payload": payload.serialize(),
            "digest": record.digest.to_hex(),
            "fingerprint": record.fingerprint,
        }))?;
    } else if !session.quiet {
        println!();
        println!("{}", "Identity payload embedded".green().bold());
        println!();
        println!("   {} {}", "Image saved:".dimmed(), output.display());
        println!("   {} {}", "Record saved:".dimmed(), record_path.display());
        println!("   {} {}", "Subject:".dimmed(), payload.subject_id);
        println!("   {} {}", "GPS:".dimmed(), payload.gps_field());
        println!(
            "   {} {}",
            "Timestamp:".dimmed(),
            format_timestamp(payload.timestamp_ms)
        );
        println!("   {} {}", "Digest:".dimmed(), &record.digest.to_hex()[..16]);
    }

    Ok(())
}
