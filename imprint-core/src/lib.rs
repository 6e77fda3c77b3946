//! Imprint Core - image provenance and tamper-forensics library
//!
//! This crate provides the primitives for tracing where an image came from and
//! whether it was altered after registration.
//!
//! # Features
//!
//! - Redundant LSB identity payloads that survive partial corruption
//! - SHA3-256 content digests and 64-bit perceptual fingerprints
//! - Bounds-checked JPEG/PNG container introspection (Exif, XMP, ICC, DQT, pHYs)
//! - Editor and social-platform attribution from quantization fingerprints
//! - Grid pixel diffs, origin classification and comparison verdicts
//!
//! All heuristics read their thresholds from a versioned [`AnalysisProfile`].
//! The core is synchronous and performs no I/O: callers decode images and
//! persist records.
//!
//! # Example
//!
//! ```
//! use imprint_core::codec::{embed, extract, GpsPoint, Payload};
//! use imprint_core::PixelBuffer;
//!
//! # fn main() -> imprint_core::Result<()> {
//! let pixels = PixelBuffer::filled(100, 100, [200, 180, 160, 255])?;
//! let payload = Payload::new("user-42", Some(GpsPoint::new(12.34, 56.78)), 1_700_000_000_000)?;
//!
//! let marked = embed(&pixels, &payload)?;
//! let found = extract(&marked).expect("payload survives an unmodified buffer");
//! assert_eq!(found.payload.subject_id, "user-42");
//! assert_eq!(found.payload.gps_field(), "12.34,56.78");
//! # Ok(())
//! # }
//! ```

pub mod attribution;
pub mod classify;
pub mod codec;
pub mod compare;
pub mod diff;
pub mod error;
pub mod hash;
pub mod inspect;
pub mod pixels;
pub mod profile;

// Re-export main types for convenience
pub use attribution::{attribute, AttributionKind, AttributionResult, PlatformScorer};
pub use classify::{
    classify, ClassificationCase, ClassificationResult, Classifier, FileFacts, SignalMetrics,
};
pub use codec::{Extraction, ExtractionConfidence, GpsPoint, LsbCodec, Payload};
pub use compare::{
    compare, CandidateImage, Comparator, ComparisonVerdict, Finding, FindingCategory,
    RegisteredOriginal,
};
pub use diff::{DiffReport, PixelDiffer, RegionDiff, Severity};
pub use error::{ImprintError, Result};
pub use hash::{ContentDigest, PerceptualFingerprint, PerceptualHasher};
pub use inspect::{inspect, ChromaSubsampling, ContainerKind, FormatSignals, QuantTable};
pub use pixels::PixelBuffer;
pub use profile::{AnalysisProfile, PROFILE_VERSION};
