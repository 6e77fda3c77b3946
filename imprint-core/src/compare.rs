//! Comparison of a candidate file against a registered original.
//!
//! A registration captures everything later comparisons need: the content
//! digest, a perceptual fingerprint, a small thumbnail for pixel diffs, the
//! original dimensions, the embedded subject and a summary of the container
//! metadata. [`Comparator::compare`] then runs every check that the available
//! data allows and turns the findings into a tamper verdict using the weights
//! in [`VerdictThresholds`].
//!
//! # Example
//!
//! ```
//! use imprint_core::compare::{CandidateImage, Comparator, RegisteredOriginal};
//! use imprint_core::PixelBuffer;
//!
//! let pixels = PixelBuffer::filled(32, 32, [10, 20, 30, 255]).unwrap();
//! let bytes = b"original file bytes";
//! let original = RegisteredOriginal::register(bytes, Some(&pixels), None);
//!
//! let verdict = Comparator::default().compare(
//!     &original,
//!     &CandidateImage { bytes, pixels: Some(&pixels) },
//! );
//! assert!(!verdict.is_tampered);
//! assert_eq!(verdict.confidence, 100);
//! assert!(verdict.findings.is_empty());
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::attribution::{AttributionKind, AttributionResult, PlatformScorer};
use crate::codec::{Extraction, LsbCodec};
use crate::diff::{DiffReport, PixelDiffer, Severity};
use crate::hash::{similarity, ContentDigest, PerceptualFingerprint, PerceptualHasher};
use crate::inspect::{inspect, ContainerKind, FormatSignals};
use crate::pixels::PixelBuffer;
use crate::profile::{AnalysisProfile, VerdictThresholds};

/// Side of the thumbnail stored with a registration.
pub const THUMBNAIL_SIZE: u32 = 256;

/// Container facts of the original, kept so later comparisons can tell new
/// metadata from metadata that was there all along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSummary {
    pub container: ContainerKind,
    pub software: Option<String>,
    /// Attribution label of the original file, if any.
    pub attribution: Option<String>,
    pub has_exif: bool,
}

impl FormatSummary {
    fn from_signals(signals: &FormatSignals, attribution: &AttributionResult) -> Self {
        Self {
            container: signals.container,
            software: signals.software.clone(),
            attribution: attribution.label.clone(),
            has_exif: signals.has_exif,
        }
    }
}

/// Everything a caller persists about an original at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredOriginal {
    pub digest: ContentDigest,
    pub fingerprint: Option<PerceptualFingerprint>,
    /// `THUMBNAIL_SIZE` square area-average of the original pixels.
    pub thumbnail: Option<PixelBuffer>,
    pub dimensions: Option<(u32, u32)>,
    /// Subject embedded as an identity watermark, if any.
    pub subject_id: Option<String>,
    pub format: FormatSummary,
    pub registered_at: DateTime<Utc>,
}

impl RegisteredOriginal {
    /// Build a registration record from the original file bytes and, when the
    /// caller could decode them, its pixels.
    pub fn register(bytes: &[u8], pixels: Option<&PixelBuffer>, subject_id: Option<&str>) -> Self {
        Self::register_with(&AnalysisProfile::default(), bytes, pixels, subject_id)
    }

    /// Like [`register`](Self::register), attributing the original under
    /// `profile` so later comparisons with the same profile agree on which
    /// metadata it already carried.
    pub fn register_with(
        profile: &AnalysisProfile,
        bytes: &[u8],
        pixels: Option<&PixelBuffer>,
        subject_id: Option<&str>,
    ) -> Self {
        let signals = inspect(bytes);
        let attribution = PlatformScorer::new(profile.attribution.clone()).attribute(&signals);
        Self {
            digest: ContentDigest::of(bytes),
            fingerprint: pixels.map(|p| PerceptualHasher::default().fingerprint(p)),
            thumbnail: pixels.and_then(|p| p.resample(THUMBNAIL_SIZE, THUMBNAIL_SIZE).ok()),
            dimensions: pixels.map(PixelBuffer::dimensions).or(signals.dimensions()),
            subject_id: subject_id.map(str::to_string),
            format: FormatSummary::from_signals(&signals, &attribution),
            registered_at: Utc::now(),
        }
    }
}

/// The file under examination.
#[derive(Debug, Clone, Copy)]
pub struct CandidateImage<'a> {
    pub bytes: &'a [u8],
    /// Decoded pixels; `None` when the caller could not decode the file.
    pub pixels: Option<&'a PixelBuffer>,
}

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Similarity,
    Metadata,
    Platform,
    Dimensions,
    Watermark,
    Pixels,
    Color,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Similarity => "similarity",
            Self::Metadata => "metadata",
            Self::Platform => "platform",
            Self::Dimensions => "dimensions",
            Self::Watermark => "watermark",
            Self::Pixels => "pixels",
            Self::Color => "color",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    pub text: String,
}

/// Outcome of a comparison. Serializable so callers can persist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    pub is_tampered: bool,
    /// 0-100.
    pub confidence: u8,
    /// Weighted sum of the findings before the threshold is applied.
    pub tamper_score: i32,
    /// Most severe first.
    pub findings: Vec<Finding>,
    pub original_digest: ContentDigest,
    pub candidate_digest: ContentDigest,
    pub original_fingerprint: Option<PerceptualFingerprint>,
    pub candidate_fingerprint: Option<PerceptualFingerprint>,
    /// `None` when either fingerprint is unavailable.
    pub similarity: Option<f64>,
    pub diff: Option<DiffReport>,
    pub attribution: Option<AttributionResult>,
    pub extraction: Option<Extraction>,
    pub profile_version: String,
}

/// Accumulates findings and the tamper score together.
#[derive(Default)]
struct Ledger {
    findings: Vec<Finding>,
    score: i32,
}

impl Ledger {
    fn note(&mut self, category: FindingCategory, severity: Severity, points: i32, text: String) {
        debug!(%category, ?severity, points, %text, "Finding");
        self.score += points;
        self.findings.push(Finding {
            category,
            severity,
            text,
        });
    }
}

/// Runs every comparison check under one [`AnalysisProfile`].
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    profile: AnalysisProfile,
}

impl Comparator {
    pub fn new(profile: AnalysisProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AnalysisProfile {
        &self.profile
    }

    #[instrument(skip_all)]
    pub fn compare(
        &self,
        original: &RegisteredOriginal,
        candidate: &CandidateImage<'_>,
    ) -> ComparisonVerdict {
        let candidate_digest = ContentDigest::of(candidate.bytes);
        if candidate_digest == original.digest {
            info!(digest = %candidate_digest, "Exact match");
            return ComparisonVerdict {
                is_tampered: false,
                confidence: 100,
                tamper_score: 0,
                findings: Vec::new(),
                original_digest: original.digest,
                candidate_digest,
                original_fingerprint: original.fingerprint.clone(),
                candidate_fingerprint: original.fingerprint.clone(),
                similarity: original.fingerprint.as_ref().map(|_| 100.0),
                diff: None,
                attribution: None,
                extraction: None,
                profile_version: self.profile.version.clone(),
            };
        }

        let weights = &self.profile.verdict;
        let mut ledger = Ledger::default();

        let candidate_fingerprint = candidate
            .pixels
            .map(|p| PerceptualHasher::default().fingerprint(p));
        let similarity = self.check_similarity(
            original.fingerprint.as_ref(),
            candidate_fingerprint.as_ref(),
            &mut ledger,
        );

        let signals = inspect(candidate.bytes);
        let attribution = PlatformScorer::new(self.profile.attribution.clone()).attribute(&signals);
        self.check_attribution(original, &attribution, &mut ledger);

        let candidate_dims = candidate
            .pixels
            .map(PixelBuffer::dimensions)
            .or(signals.dimensions());
        if let (Some(before), Some(after)) = (original.dimensions, candidate_dims) {
            if before != after {
                ledger.note(
                    FindingCategory::Dimensions,
                    Severity::Medium,
                    weights.dimension_points,
                    format!(
                        "dimensions changed from {}x{} to {}x{}",
                        before.0, before.1, after.0, after.1
                    ),
                );
            }
        }

        let extraction = self.check_watermark(original, candidate.pixels, &mut ledger);
        let diff = self.check_pixels(original.thumbnail.as_ref(), candidate.pixels, &mut ledger);

        let tamper_score = ledger.score.max(0);
        let is_tampered = tamper_score >= weights.tamper_score;
        let confidence = verdict_confidence(tamper_score, weights);

        let mut findings = ledger.findings;
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        info!(
            tampered = is_tampered,
            confidence,
            tamper_score,
            findings = findings.len(),
            "Comparison verdict"
        );

        ComparisonVerdict {
            is_tampered,
            confidence,
            tamper_score,
            findings,
            original_digest: original.digest,
            candidate_digest,
            original_fingerprint: original.fingerprint.clone(),
            candidate_fingerprint,
            similarity,
            diff,
            attribution: Some(attribution),
            extraction,
            profile_version: self.profile.version.clone(),
        }
    }

    fn check_similarity(
        &self,
        original: Option<&PerceptualFingerprint>,
        candidate: Option<&PerceptualFingerprint>,
        ledger: &mut Ledger,
    ) -> Option<f64> {
        let weights = &self.profile.verdict;
        let Some(score) = similarity(original, candidate) else {
            let missing = if original.is_none() {
                "original fingerprint missing"
            } else {
                "candidate pixels not decoded"
            };
            ledger.note(
                FindingCategory::Similarity,
                Severity::Low,
                0,
                format!("perceptual similarity unavailable: {missing}"),
            );
            return None;
        };

        if score < weights.similarity_strong {
            ledger.note(
                FindingCategory::Similarity,
                Severity::High,
                weights.similarity_strong_points,
                format!("perceptual similarity {score:.1}% indicates different content"),
            );
        } else if score < weights.similarity_moderate {
            ledger.note(
                FindingCategory::Similarity,
                Severity::Medium,
                weights.similarity_moderate_points,
                format!("perceptual similarity {score:.1}% indicates visible changes"),
            );
        }
        Some(score)
    }

    fn check_attribution(
        &self,
        original: &RegisteredOriginal,
        attribution: &AttributionResult,
        ledger: &mut Ledger,
    ) {
        let weights = &self.profile.verdict;
        let label = attribution.label.as_deref().unwrap_or_default();
        match attribution.kind {
            AttributionKind::Metadata => {
                // Metadata the original already carried is not evidence of editing.
                if original.format.attribution.as_deref() == Some(label) {
                    return;
                }
                ledger.note(
                    FindingCategory::Metadata,
                    Severity::High,
                    weights.editor_points,
                    format!("processed with {label} ({})", attribution.basis),
                );
            }
            AttributionKind::Platform => ledger.note(
                FindingCategory::Platform,
                Severity::Low,
                -weights.platform_credit,
                format!(
                    "re-encoded by {label} ({}); byte-level differences are expected",
                    attribution.basis
                ),
            ),
            AttributionKind::Screenshot => ledger.note(
                FindingCategory::Platform,
                Severity::Medium,
                0,
                format!("captured with {label} ({})", attribution.basis),
            ),
            AttributionKind::Stripped => ledger.note(
                FindingCategory::Metadata,
                Severity::Low,
                0,
                "metadata stripped by a re-encode".to_string(),
            ),
            AttributionKind::Estimate | AttributionKind::None => {}
        }
    }

    fn check_watermark(
        &self,
        original: &RegisteredOriginal,
        pixels: Option<&PixelBuffer>,
        ledger: &mut Ledger,
    ) -> Option<Extraction> {
        let weights = &self.profile.verdict;
        let expected = original.subject_id.as_deref()?;
        let Some(pixels) = pixels else {
            ledger.note(
                FindingCategory::Watermark,
                Severity::Low,
                0,
                "watermark check unavailable: candidate pixels not decoded".to_string(),
            );
            return None;
        };

        let extraction = LsbCodec::new(self.profile.codec.clone()).extract(pixels);
        match &extraction {
            None => ledger.note(
                FindingCategory::Watermark,
                Severity::Medium,
                weights.watermark_missing_points,
                format!("identity watermark for {expected} not recovered"),
            ),
            Some(found) if found.payload.subject_id != expected => ledger.note(
                FindingCategory::Watermark,
                Severity::High,
                weights.watermark_mismatch_points,
                format!(
                    "watermark names {}, expected {expected}",
                    found.payload.subject_id
                ),
            ),
            Some(_) => {}
        }
        extraction
    }

    fn check_pixels(
        &self,
        thumbnail: Option<&PixelBuffer>,
        pixels: Option<&PixelBuffer>,
        ledger: &mut Ledger,
    ) -> Option<DiffReport> {
        let weights = &self.profile.verdict;
        let (Some(thumbnail), Some(pixels)) = (thumbnail, pixels) else {
            let missing = if thumbnail.is_none() {
                "original thumbnail missing"
            } else {
                "candidate pixels not decoded"
            };
            ledger.note(
                FindingCategory::Pixels,
                Severity::Low,
                0,
                format!("pixel comparison unavailable: {missing}"),
            );
            return None;
        };

        let report = match PixelDiffer::new(self.profile.diff.clone()).diff(thumbnail, pixels) {
            Ok(report) => report,
            Err(e) => {
                ledger.note(
                    FindingCategory::Pixels,
                    Severity::Low,
                    0,
                    format!("pixel comparison unavailable: {e}"),
                );
                return None;
            }
        };

        if report.changed_pct >= weights.changed_pct {
            ledger.note(
                FindingCategory::Pixels,
                Severity::High,
                weights.changed_points,
                format!("{:.1}% of pixels changed", report.changed_pct),
            );
        }

        let mut region_points = 0;
        for region in &report.hot_regions {
            let (severity, points) = match region.severity {
                Some(Severity::High) => (Severity::High, weights.high_region_points),
                Some(Severity::Medium) => (Severity::Medium, weights.medium_region_points),
                _ => continue,
            };
            let awarded = points.min(weights.region_points_cap - region_points).max(0);
            region_points += awarded;
            ledger.note(
                FindingCategory::Pixels,
                severity,
                awarded,
                format!(
                    "{} region differs (mean divergence {:.1})",
                    region.name, region.score
                ),
            );
        }

        if report.brightness_shift.abs() >= weights.brightness_shift {
            ledger.note(
                FindingCategory::Color,
                Severity::Medium,
                weights.color_points,
                format!("global brightness shifted by {:+.1}", report.brightness_shift),
            );
        }
        let mean_shift = report.channel_shifts.iter().sum::<f64>() / 3.0;
        if let Some((channel, shift)) = report
            .channel_shifts
            .iter()
            .zip(["red", "green", "blue"])
            .map(|(s, name)| (name, *s))
            .filter(|(_, s)| (s - mean_shift).abs() >= weights.brightness_shift)
            .max_by(|a, b| (a.1 - mean_shift).abs().total_cmp(&(b.1 - mean_shift).abs()))
        {
            ledger.note(
                FindingCategory::Color,
                Severity::Medium,
                weights.color_points,
                format!("{channel} channel shifted by {shift:+.1} (color cast)"),
            );
        }

        Some(report)
    }
}

/// Distance from the tamper threshold mapped onto 50-`max_confidence`.
fn verdict_confidence(score: i32, weights: &VerdictThresholds) -> u8 {
    let threshold = weights.tamper_score.max(1) as f64;
    let distance = (score as f64 - threshold).abs() / threshold;
    let confidence = 50.0 + 50.0 * distance.min(1.0);
    confidence.min(f64::from(weights.max_confidence)).round() as u8
}

/// Compare with the default profile.
pub fn compare(original: &RegisteredOriginal, candidate: &CandidateImage<'_>) -> ComparisonVerdict {
    Comparator::default().compare(original, candidate)
}
