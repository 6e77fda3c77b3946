//! Example showing the tracing output of a full comparison.
//!
//! Run with: cargo run -p imprint-core --example compare_tracing

use imprint_core::codec::{GpsPoint, LsbCodec, Payload};
use imprint_core::compare::{CandidateImage, Comparator, RegisteredOriginal};
use imprint_core::PixelBuffer;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Core spans at debug, everything else at info
    fmt()
        .with_env_filter(EnvFilter::new("imprint_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Comparison Tracing Demo ===\n");

    let scene = match PixelBuffer::from_fn(320, 240, |x, y| {
        [(x % 256) as u8, (y % 256) as u8, ((x + y) / 3 % 256) as u8, 255]
    }) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to build scene: {}", e);
            return;
        }
    };

    let payload = match Payload::new("user-42", Some(GpsPoint::new(48.85, 2.35)), 1_700_000_000_000) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid payload: {}", e);
            return;
        }
    };

    let marked = match LsbCodec::default().embed(&scene, &payload) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Embedding failed: {}", e);
            return;
        }
    };
    let original = RegisteredOriginal::register(b"original-bytes", Some(&marked), Some("user-42"));

    // Paint over the lower right corner of the marked copy
    let edited = match PixelBuffer::from_fn(320, 240, |x, y| {
        if x >= 200 && y >= 150 {
            [240, 240, 240, 255]
        } else {
            marked.pixel(x, y)
        }
    }) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to build edit: {}", e);
            return;
        }
    };

    println!("Comparing edited copy...\n");

    let verdict = Comparator::default().compare(
        &original,
        &CandidateImage {
            bytes: b"edited-bytes",
            pixels: Some(&edited),
        },
    );

    println!("\nTampered:   {}", verdict.is_tampered);
    println!("Confidence: {}%", verdict.confidence);
    println!("Score:      {}", verdict.tamper_score);
    for finding in &verdict.findings {
        println!("  [{:?}] {}: {}", finding.severity, finding.category, finding.text);
    }
}
