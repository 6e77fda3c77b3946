//! Classify command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imprint_core::{Classifier, LsbCodec};
use tracing::debug;

use crate::utils::{decode_image, print_json, read_input};
use crate::Session;

/// Execute the classify command.
pub fn execute(file: PathBuf, session: &Session) -> Result<()> {
    let content = read_input(&file)?;
    let pixels = decode_image(&content)?;

    let has_payload = LsbCodec::new(session.profile.codec.clone())
        .extract(&pixels)
        .is_some();
    debug!(has_payload, "Payload probe");

    let name = file.file_name().and_then(|n| n.to_str());
    let result = Classifier::new(session.profile.classification.clone()).classify(
        &pixels,
        content.len() as u64,
        name,
        has_payload,
    );

    if session.json {
        print_json(&result)?;
    } else if !session.quiet {
        println!();
        println!(
            "{} {}",
            result.case.to_string().green().bold(),
            format!("({}% confidence)", result.confidence).dimmed()
        );
        println!();
        println!(
            "   {} synthetic {}, device {}, web {}",
            "Scores:".dimmed(),
            result.scores.synthetic,
            result.scores.device,
            result.scores.web
        );
        for line in &result.evidence {
            println!("   {} {}", "-".dimmed(), line);
        }
    }

    Ok(())
}
