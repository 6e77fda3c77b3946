//! Inspect command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imprint_core::inspect::inspect;
use imprint_core::PlatformScorer;
use serde_json::json;
use tracing::{debug, warn};

use crate::utils::{print_json, read_input};
use crate::Session;

/// Execute the inspect command.
pub fn execute(file: PathBuf, session: &Session) -> Result<()> {
    let content = read_input(&file)?;
    let signals = inspect(&content);
    if signals.truncated {
        warn!(path = %file.display(), segments = signals.segments, "Container walk stopped early");
    }
    debug!(container = ?signals.container, segments = signals.segments, "Inspected");

    let attribution = PlatformScorer::new(session.profile.attribution.clone()).attribute(&signals);

    if session.json {
        return print_json(&json!({
            "signals": signals,
            "attribution": attribution,
        }));
    }
    if session.quiet {
        return Ok(());
    }

    let show = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            println!("   {} {}", format!("{label}:").dimmed(), value);
        }
    };

    println!();
    println!("{}", format!("{:?} container", signals.container).bold());
    println!();
    show(
        "Dimensions",
        signals.dimensions().map(|(w, h)| format!("{w}x{h}")),
    );
    show("Software", signals.software.clone());
    show(
        "Camera",
        match (&signals.make, &signals.model) {
            (Some(make), Some(model)) => Some(format!("{make} {model}")),
            (make, model) => make.clone().or_else(|| model.clone()),
        },
    );
    show("XMP tool", signals.xmp_creator_tool.clone());
    show("ICC profile", signals.icc_profile.clone());
    show("Subsampling", signals.subsampling.map(|s| s.to_string()));
    show(
        "Luma DQT",
        signals
            .luma_table
            .as_ref()
            .map(|t| format!("DC={} AC mean={:.2}", t.dc(), t.ac_mean())),
    );
    show(
        "Density",
        signals
            .pixel_density
            .and_then(|d| d.dpi())
            .map(|dpi| format!("{dpi:.0} dpi")),
    );
    for comment in &signals.comments {
        show("Comment", Some(comment.clone()));
    }
    let flags: Vec<&str> = [
        (signals.has_jfif, "JFIF"),
        (signals.has_exif, "Exif"),
        (signals.has_icc, "ICC"),
        (signals.photoshop_marker, "Photoshop"),
        (signals.progressive, "progressive"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if !flags.is_empty() {
        show("Markers", Some(flags.join(", ")));
    }
    if signals.truncated {
        println!("   {}", "Structure truncated; signals are partial".yellow());
    }

    println!();
    match &attribution.label {
        Some(label) if attribution.is_named() => println!(
            "   {} {} ({}, score {})",
            "Attribution:".dimmed(),
            label.green().bold(),
            attribution.basis,
            attribution.score
        ),
        Some(label) => println!("   {} {}", "Attribution:".dimmed(), label),
        None => println!(
            "   {} {}",
            "Attribution:".dimmed(),
            attribution.basis.yellow()
        ),
    }

    Ok(())
}
