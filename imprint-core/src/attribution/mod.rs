//! Attribution of an image to an editing tool or a re-encoding platform.
//!
//! Embedded metadata always outranks heuristics: a software tag, an XMP
//! creator tool, a Photoshop resource block, an Adobe ICC profile or an editor
//! keyword in a comment is reported as-is. Only when none is present are the
//! JPEG quantization tables scored against the platform table in
//! [`AttributionProfile`].
//!
//! # Example
//!
//! ```
//! use imprint_core::attribution::{attribute, AttributionKind};
//! use imprint_core::inspect::FormatSignals;
//!
//! let signals = FormatSignals {
//!     software: Some("GIMP 2.10.34".into()),
//!     ..FormatSignals::default()
//! };
//! let result = attribute(&signals);
//! assert_eq!(result.kind, AttributionKind::Metadata);
//! assert_eq!(result.label.as_deref(), Some("GIMP 2.10.34"));
//! ```

mod quality;

pub use quality::{estimate_quality, ijg_table, IJG_LUMINANCE};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inspect::FormatSignals;
use crate::profile::{AttributionProfile, PlatformSignature};

/// Score reported for metadata-grade attributions.
pub const METADATA_SCORE: i32 = 100;

/// What an attribution rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionKind {
    /// A tool named itself in embedded metadata.
    Metadata,
    /// Pixel density written by a known OS screenshot tool.
    Screenshot,
    /// Quantization fingerprint of a re-encoding platform.
    Platform,
    /// No platform reached the threshold; a quality estimate is reported.
    Estimate,
    /// JFIF without Exif and no quantization tables to score.
    Stripped,
    /// Nothing to attribute.
    None,
}

/// Outcome of [`PlatformScorer::attribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub label: Option<String>,
    pub score: i32,
    /// Human-readable account of the evidence used.
    pub basis: String,
    pub kind: AttributionKind,
}

impl AttributionResult {
    fn none(basis: impl Into<String>) -> Self {
        Self {
            label: None,
            score: 0,
            basis: basis.into(),
            kind: AttributionKind::None,
        }
    }

    fn metadata(label: impl Into<String>, basis: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            score: METADATA_SCORE,
            basis: basis.into(),
            kind: AttributionKind::Metadata,
        }
    }

    /// A named tool or platform was identified.
    pub fn is_named(&self) -> bool {
        matches!(
            self.kind,
            AttributionKind::Metadata | AttributionKind::Screenshot | AttributionKind::Platform
        )
    }
}

/// Scores [`FormatSignals`] against an [`AttributionProfile`].
#[derive(Debug, Clone, Default)]
pub struct PlatformScorer {
    profile: AttributionProfile,
}

impl PlatformScorer {
    pub fn new(profile: AttributionProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AttributionProfile {
        &self.profile
    }

    pub fn attribute(&self, signals: &FormatSignals) -> AttributionResult {
        if let Some(found) = self.from_metadata(signals) {
            return found;
        }
        if let Some(found) = self.from_density(signals) {
            return found;
        }

        let Some(luma) = signals.luma_table.as_ref() else {
            if signals.has_jfif && !signals.has_exif {
                return AttributionResult {
                    label: Some("Metadata stripped".to_string()),
                    score: 0,
                    basis: "JFIF header without Exif".to_string(),
                    kind: AttributionKind::Stripped,
                };
            }
            return AttributionResult::none("no quantization tables");
        };

        let scores: Vec<(&PlatformSignature, i32, Vec<String>)> = self
            .profile
            .platforms
            .iter()
            .map(|platform| {
                let (score, reasons) = self.score_platform(platform, signals);
                (platform, score, reasons)
            })
            .collect();

        for (platform, score, _) in &scores {
            debug!(platform = %platform.name, score, "Platform score");
        }

        // First listed platform wins ties.
        let best = scores
            .iter()
            .fold(None::<&(&PlatformSignature, i32, Vec<String>)>, |best, s| {
                match best {
                    Some(b) if b.1 >= s.1 => Some(b),
                    _ => Some(s),
                }
            });

        if let Some((platform, score, reasons)) = best {
            if *score >= self.profile.min_score {
                return AttributionResult {
                    label: Some(platform.name.clone()),
                    score: *score,
                    basis: format!("{} re-encode: {}", platform.category, reasons.join(", ")),
                    kind: AttributionKind::Platform,
                };
            }
        }

        let dc = luma.dc();
        let chroma = signals
            .subsampling
            .map_or_else(|| "unknown".to_string(), |s| s.to_string());
        let label = match estimate_quality(luma) {
            Some(q) => format!("quality ~{q}%, DC={dc}, chroma={chroma}"),
            None => format!("quality unknown, DC={dc}, chroma={chroma}"),
        };
        AttributionResult {
            label: Some(label),
            score: best.map_or(0, |b| b.1),
            basis: format!(
                "no platform reached {} points",
                self.profile.min_score
            ),
            kind: AttributionKind::Estimate,
        }
    }

    fn from_metadata(&self, signals: &FormatSignals) -> Option<AttributionResult> {
        if let Some(software) = &signals.software {
            return Some(AttributionResult::metadata(software, "software tag"));
        }
        if let Some(tool) = &signals.xmp_creator_tool {
            return Some(AttributionResult::metadata(tool, "XMP CreatorTool"));
        }
        if signals.photoshop_marker {
            return Some(AttributionResult::metadata(
                "Adobe Photoshop",
                "Photoshop resource block (APP13)",
            ));
        }
        if signals.has_adobe_icc() {
            let profile = signals.icc_profile.as_deref().unwrap_or_default();
            return Some(AttributionResult::metadata(
                "Adobe software",
                format!("ICC profile \"{profile}\""),
            ));
        }

        for text in signals.text_fields() {
            let lower = text.to_ascii_lowercase();
            let hit = self
                .profile
                .editor_keywords
                .iter()
                .find(|k| lower.contains(&k.keyword.to_ascii_lowercase()));
            if let Some(keyword) = hit {
                return Some(AttributionResult::metadata(
                    &keyword.label,
                    format!("keyword \"{}\" in comment", keyword.keyword),
                ));
            }
        }
        None
    }

    fn from_density(&self, signals: &FormatSignals) -> Option<AttributionResult> {
        let density = signals.pixel_density?;
        if density.unit != 1 || density.x != density.y {
            return None;
        }
        let tool = self
            .profile
            .screenshot_densities
            .iter()
            .find(|d| d.pixels_per_meter.contains(&density.x))?;
        Some(AttributionResult {
            label: Some(tool.label.clone()),
            score: METADATA_SCORE,
            basis: format!("pHYs density {} px/m", density.x),
            kind: AttributionKind::Screenshot,
        })
    }

    fn score_platform(
        &self,
        platform: &PlatformSignature,
        signals: &FormatSignals,
    ) -> (i32, Vec<String>) {
        let mut score = 0;
        let mut reasons = Vec::new();

        if let Some(luma) = &signals.luma_table {
            let dc = luma.dc();
            let [lo, hi] = platform.dc_range;
            if (lo..=hi).contains(&dc) {
                score += platform.dc_points;
                reasons.push(format!("DC={dc}"));
            }
            let ac = luma.ac_mean();
            let [lo, hi] = platform.ac_mean_range;
            if (lo..=hi).contains(&ac) {
                score += platform.ac_points;
                reasons.push(format!("AC mean {ac:.1}"));
            }
        }

        if let (Some(expected), Some(observed)) = (platform.subsampling, signals.subsampling) {
            if expected == observed {
                score += platform.subsampling_points;
                reasons.push(observed.to_string());
            } else if self
                .profile
                .platforms
                .iter()
                .any(|other| other.subsampling == Some(observed))
            {
                score -= platform.subsampling_penalty;
            }
        }

        if let Some(edge) = signals.long_edge() {
            if platform.long_edges.contains(&edge) {
                score += platform.dimension_points;
                reasons.push(format!("long edge {edge}"));
            }
        }

        if signals.has_exif {
            score -= self.profile.exif_penalty;
        } else {
            score += platform.no_exif_points;
            reasons.push("no Exif".to_string());
        }

        (score, reasons)
    }
}

/// Attribute with the default profile.
pub fn attribute(signals: &FormatSignals) -> AttributionResult {
    PlatformScorer::default().attribute(signals)
}
