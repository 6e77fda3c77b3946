//! Extract command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use imprint_core::{ExtractionConfidence, LsbCodec};
use tracing::{info, warn};

use crate::utils::{decode_image, format_timestamp, print_json, read_input};
use crate::Session;

/// Execute the extract command.
pub fn execute(file: PathBuf, session: &Session) -> Result<()> {
    let content = read_input(&file)?;
    let pixels = decode_image(&content)?;

    let Some(found) = LsbCodec::new(session.profile.codec.clone()).extract(&pixels) else {
        warn!(path = %file.display(), "No payload recovered");
        if session.json {
            print_json(&serde_json::Value::Null)?;
        }
        bail!("No identity payload found in {}", file.display());
    };

    info!(
        subject = %found.payload.subject_id,
        matches = found.matches,
        confidence = ?found.confidence,
        "Payload recovered"
    );

    if session.json {
        print_json(&found)?;
    } else if !session.quiet {
        let confidence = match found.confidence {
            ExtractionConfidence::VeryHigh => "very high".green(),
            ExtractionConfidence::High => "high".yellow(),
        };
        println!();
        println!("{}", "Identity payload recovered".green().bold());
        println!();
        println!("   {} {}", "Subject:".dimmed(), found.payload.subject_id);
        println!("   {} {}", "GPS:".dimmed(), found.payload.gps_field());
        println!(
            "   {} {}",
            "Timestamp:".dimmed(),
            format_timestamp(found.payload.timestamp_ms)
        );
        println!(
            "   {} {} ({} of {} windows agree)",
            "Confidence:".dimmed(),
            confidence,
            found.matches,
            found.candidates
        );
    }

    Ok(())
}
