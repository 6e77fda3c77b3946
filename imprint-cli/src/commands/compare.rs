//! Compare command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use imprint_core::compare::{CandidateImage, Comparator};
use imprint_core::Severity;
use tracing::{error, info, warn};

use crate::utils::{decode_image, load_record, print_json, read_input};
use crate::Session;

/// Execute the compare command.
pub fn execute(candidate: PathBuf, record: PathBuf, session: &Session) -> Result<()> {
    let content = read_input(&candidate)?;
    let original = load_record(&record)?;
    info!(path = %record.display(), registered_at = %original.registered_at, "Loaded record");

    // Comparison degrades to byte-level checks when pixels are unavailable.
    let pixels = match decode_image(&content) {
        Ok(pixels) => Some(pixels),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Candidate pixels unavailable");
            None
        }
    };

    let verdict = Comparator::new(session.profile.clone()).compare(
        &original,
        &CandidateImage {
            bytes: &content,
            pixels: pixels.as_ref(),
        },
    );

    if session.json {
        print_json(&verdict)?;
    } else if !session.quiet {
        println!();
        if verdict.is_tampered {
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!("{}", "║              TAMPERED                  ║".red().bold());
            println!("{}", "╚════════════════════════════════════════╝".red());
        } else {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!("{}", "║            NOT TAMPERED                ║".green().bold());
            println!("{}", "╚════════════════════════════════════════╝".green());
        }
        println!();
        println!("   {} {}%", "Confidence:".dimmed(), verdict.confidence);
        println!("   {} {}", "Tamper score:".dimmed(), verdict.tamper_score);
        match verdict.similarity {
            Some(score) => println!("   {} {score:.1}%", "Similarity:".dimmed()),
            None => println!("   {} {}", "Similarity:".dimmed(), "unavailable".yellow()),
        }
        if let Some(attribution) = verdict.attribution.as_ref().filter(|a| a.is_named()) {
            if let Some(label) = &attribution.label {
                println!("   {} {}", "Attribution:".dimmed(), label);
            }
        }
        if let Some(found) = &verdict.extraction {
            println!("   {} {}", "Watermark:".dimmed(), found.payload.subject_id);
        }
        if !verdict.findings.is_empty() {
            println!();
            for finding in &verdict.findings {
                let marker = match finding.severity {
                    Severity::High => "HIGH".red().bold(),
                    Severity::Medium => "MED ".yellow(),
                    Severity::Low => "LOW ".dimmed(),
                };
                println!("   {} [{}] {}", marker, finding.category, finding.text);
            }
        }
        println!();
        println!("   {} {}", "Profile:".dimmed(), verdict.profile_version);
    }

    if verdict.is_tampered {
        error!(
            tamper_score = verdict.tamper_score,
            findings = verdict.findings.len(),
            "Candidate is tampered"
        );
        bail!(
            "TAMPERED: {} findings, tamper score {}",
            verdict.findings.len(),
            verdict.tamper_score
        );
    }
    Ok(())
}
