//! Hash command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imprint_core::{ContentDigest, PerceptualHasher};
use serde_json::json;
use tracing::warn;

use crate::utils::{decode_image, print_json, read_input};
use crate::Session;

/// Execute the hash command.
pub fn execute(file: PathBuf, session: &Session) -> Result<()> {
    let content = read_input(&file)?;
    let digest = ContentDigest::of(&content);

    // Undecodable files still get a content digest.
    let fingerprint = match decode_image(&content) {
        Ok(pixels) => Some(PerceptualHasher::default().fingerprint(&pixels)),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Perceptual fingerprint unavailable");
            None
        }
    };

    if session.json {
        print_json(&json!({
            "digest": digest.to_hex(),
            "fingerprint": fingerprint,
        }))?;
    } else if !session.quiet {
        println!("{}  {}", "sha3-256".dimmed(), digest);
        match &fingerprint {
            Some(fp) => println!("{}     {}", "ahash".dimmed(), fp),
            None => println!("{}     {}", "ahash".dimmed(), "unavailable".yellow()),
        }
    }

    Ok(())
}
