//! Origin classification from pixel statistics and file priors.
//!
//! Three independent scores (synthetic, device capture, web re-encode) are
//! accumulated from [`SignalMetrics`] and from file-level priors (container
//! by extension, canonical dimensions, camera or download file names), then
//! a decision rule picks the case. A recovered identity payload short-circuits
//! all of this.
//!
//! Sampling is driven by an injected RNG, so tests pass a seeded [`StdRng`]
//! while [`Classifier::classify`] uses the thread-local generator.
//!
//! [`StdRng`]: rand::rngs::StdRng

mod signals;

pub use signals::SignalMetrics;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::pixels::PixelBuffer;
use crate::profile::ClassificationThresholds;

const CAMERA_NAME_PREFIXES: &[&str] = &[
    "img_", "img-", "dsc", "pxl_", "mvimg_", "dji_", "gopr", "_mg_", "p_20",
];
const DOWNLOAD_NAME_HINTS: &[&str] = &[
    "download",
    "whatsapp image",
    "fb_img",
    "received_",
    "unnamed",
    "image (",
    "images",
];
const SCREENSHOT_NAME_HINTS: &[&str] = &[
    "screenshot",
    "screen shot",
    "screen_shot",
    "bildschirmfoto",
    "capture",
    "snip",
];

/// Sensor aspect ratios (long edge over short edge).
const CAMERA_ASPECTS: &[f64] = &[4.0 / 3.0, 3.0 / 2.0];

/// Aspect ratios an uncropped image plausibly has.
const CANONICAL_ASPECTS: &[f64] = &[
    1.0,
    5.0 / 4.0,
    4.0 / 3.0,
    3.0 / 2.0,
    16.0 / 10.0,
    16.0 / 9.0,
    2.0,
    19.5 / 9.0,
];

/// Where an image most likely came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationCase {
    MobileCapture,
    Synthetic,
    WebDownload,
    ScreenCapture,
    Watermarked,
    WatermarkedAndCropped,
}

impl fmt::Display for ClassificationCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MobileCapture => "mobile capture",
            Self::Synthetic => "synthetic",
            Self::WebDownload => "web download",
            Self::ScreenCapture => "screen capture",
            Self::Watermarked => "watermarked",
            Self::WatermarkedAndCropped => "watermarked and cropped",
        };
        f.write_str(s)
    }
}

/// Raw scores before the decision rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseScores {
    pub synthetic: i32,
    pub device: i32,
    pub web: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub case: ClassificationCase,
    /// 0-100.
    pub confidence: u8,
    /// Every metric and every rule that fired, in evaluation order.
    pub evidence: Vec<String>,
    pub scores: CaseScores,
    /// Absent when a recovered payload short-circuited the statistics.
    pub metrics: Option<SignalMetrics>,
}

/// File-level facts supplied by the caller alongside the pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFacts<'a> {
    /// Size of the encoded file; 0 when unknown.
    pub size: u64,
    pub name: Option<&'a str>,
    /// An identity payload was already recovered from these pixels.
    pub has_payload: bool,
}

impl FileFacts<'_> {
    fn lower_name(&self) -> String {
        self.name.unwrap_or_default().to_ascii_lowercase()
    }

    fn extension(&self) -> Option<String> {
        let name = self.name?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    fn is_png(&self) -> bool {
        self.extension().as_deref() == Some("png")
    }

    fn is_jpeg(&self) -> bool {
        matches!(self.extension().as_deref(), Some("jpg" | "jpeg" | "jfif"))
    }
}

/// Per-case point accumulator that records why points were awarded.
struct ScoreSheet<'e> {
    scores: CaseScores,
    evidence: &'e mut Vec<String>,
}

impl ScoreSheet<'_> {
    fn award(&mut self, case: ClassificationCase, points: i32, reason: impl fmt::Display) {
        if points == 0 {
            return;
        }
        let slot = match case {
            ClassificationCase::Synthetic => &mut self.scores.synthetic,
            ClassificationCase::WebDownload => &mut self.scores.web,
            _ => &mut self.scores.device,
        };
        *slot += points;
        self.evidence.push(format!("+{points} {case}: {reason}"));
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: ClassificationThresholds,
}

impl Classifier {
    pub fn new(thresholds: ClassificationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ClassificationThresholds {
        &self.thresholds
    }

    /// Classify with the thread-local RNG.
    pub fn classify(
        &self,
        pixels: &PixelBuffer,
        file_size: u64,
        file_name: Option<&str>,
        has_payload: bool,
    ) -> ClassificationResult {
        let facts = FileFacts {
            size: file_size,
            name: file_name,
            has_payload,
        };
        self.classify_with_rng(pixels, facts, &mut rand::thread_rng())
    }

    /// Classify with a caller-supplied RNG for deterministic sampling.
    #[instrument(skip_all)]
    pub fn classify_with_rng<R: Rng + ?Sized>(
        &self,
        pixels: &PixelBuffer,
        facts: FileFacts<'_>,
        rng: &mut R,
    ) -> ClassificationResult {
        if facts.has_payload {
            return self.watermarked(pixels);
        }

        let t = &self.thresholds;
        let metrics = SignalMetrics::measure(pixels, facts.size, t, rng);
        let mut evidence = metrics.evidence();
        let scores = self.score(pixels, &facts, &metrics, &mut evidence);
        debug!(
            synthetic = scores.synthetic,
            device = scores.device,
            web = scores.web,
            "Classification scores"
        );

        // Listed order breaks ties.
        let mut ranking = [
            (ClassificationCase::MobileCapture, scores.device),
            (ClassificationCase::Synthetic, scores.synthetic),
            (ClassificationCase::WebDownload, scores.web),
        ];
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        let (mut case, top) = ranking[0];
        let (runner_up, second) = ranking[1];

        let mut confidence = if top >= t.high_confidence_score {
            top.min(i32::from(t.max_confidence))
        } else {
            evidence.push(format!(
                "no case reached {} points; reduced confidence",
                t.high_confidence_score
            ));
            top.min(i32::from(t.reduced_confidence_cap))
        };
        if top - second < t.close_margin {
            confidence = confidence.min(i32::from(t.mixed_confidence_cap));
            evidence.push(format!(
                "mixed signals: {case} {top} vs {runner_up} {second}"
            ));
        }

        if matches!(
            case,
            ClassificationCase::Synthetic | ClassificationCase::WebDownload
        ) {
            if let Some(indicator) = self.screenshot_indicator(pixels, &facts) {
                evidence.push(format!("screen capture: {indicator}"));
                case = ClassificationCase::ScreenCapture;
            }
        }

        ClassificationResult {
            case,
            confidence: confidence.clamp(0, 100) as u8,
            evidence,
            scores,
            metrics: Some(metrics),
        }
    }

    fn score(
        &self,
        pixels: &PixelBuffer,
        facts: &FileFacts<'_>,
        m: &SignalMetrics,
        evidence: &mut Vec<String>,
    ) -> CaseScores {
        use ClassificationCase::{MobileCapture as Device, Synthetic, WebDownload as Web};

        let t = &self.thresholds;
        let (width, height) = pixels.dimensions();
        let long_edge = width.max(height);
        let name = facts.lower_name();
        let mut sheet = ScoreSheet {
            scores: CaseScores::default(),
            evidence,
        };

        // Synthetic origin.
        if facts.is_png() {
            sheet.award(Synthetic, t.png_container_points, "PNG container");
        }
        if width % 64 == 0 && height % 64 == 0 {
            sheet.award(
                Synthetic,
                t.grid64_dimension_points,
                format_args!("{width}x{height} is a multiple of 64"),
            );
        }
        if m.smooth_block_ratio >= t.smooth_block_ratio {
            sheet.award(Synthetic, t.smooth_block_points, "mostly smooth blocks");
        }
        if m.noise_level < t.low_noise_level {
            sheet.award(Synthetic, t.low_noise_points, "almost no sensor noise");
        }
        if m.channel_correlation >= t.high_correlation {
            sheet.award(
                Synthetic,
                t.high_correlation_points,
                "channels move in lockstep",
            );
        }
        if m.texture_uniformity >= t.uniform_texture_ratio {
            sheet.award(Synthetic, t.uniform_texture_points, "uniform local texture");
        }
        if m.edge_coherence >= t.coherent_edge_ratio {
            sheet.award(Synthetic, t.coherent_edge_points, "coherent gradients");
        }
        if m.entropy_bits < t.low_entropy_bits {
            sheet.award(Synthetic, t.low_entropy_points, "low colour entropy");
        }

        // Device capture.
        if m.noise_level >= t.high_noise_level {
            sheet.award(Device, t.high_noise_points, "sensor noise present");
        }
        if m.entropy_bits >= t.high_entropy_bits {
            sheet.award(Device, t.high_entropy_points, "high colour entropy");
        }
        if CAMERA_NAME_PREFIXES.iter().any(|p| name.starts_with(p)) {
            sheet.award(Device, t.camera_name_points, "camera file name");
        }
        if let Some(bpp) = m.bytes_per_pixel {
            if bpp >= t.rich_bytes_per_pixel {
                sheet.award(Device, t.rich_bytes_points, "lightly compressed");
            }
        }
        if m.megapixels >= t.camera_megapixels {
            sheet.award(
                Device,
                t.camera_megapixel_points,
                format_args!("{:.1} MP sensor resolution", m.megapixels),
            );
        }
        if matches_aspect(width, height, CAMERA_ASPECTS, t.aspect_tolerance) {
            sheet.award(Device, t.camera_aspect_points, "sensor aspect ratio");
        }
        if 1.0 - m.smooth_block_ratio >= t.textured_ratio {
            sheet.award(Device, t.textured_points, "textured throughout");
        }

        // Web re-encode.
        if let Some(bpp) = m.bytes_per_pixel {
            if bpp <= t.lean_bytes_per_pixel {
                sheet.award(Web, t.lean_bytes_points, "heavily compressed");
            }
        }
        if t.social_long_edges.contains(&long_edge) {
            sheet.award(
                Web,
                t.social_edge_points,
                format_args!("long edge {long_edge} matches a social resize"),
            );
        }
        if m.clustering_ratio >= t.clustered_ratio {
            sheet.award(Web, t.clustered_points, "clustered brightness");
        }
        if DOWNLOAD_NAME_HINTS.iter().any(|h| name.contains(h)) {
            sheet.award(Web, t.download_name_points, "download file name");
        }
        if facts.is_jpeg() {
            sheet.award(Web, t.jpeg_container_points, "JPEG container");
        }
        let [lo, hi] = t.blocky_ratio_range;
        if (lo..=hi).contains(&m.smooth_block_ratio) {
            sheet.award(Web, t.blocky_points, "patchy block smoothness");
        }

        sheet.scores
    }

    fn screenshot_indicator(&self, pixels: &PixelBuffer, facts: &FileFacts<'_>) -> Option<String> {
        let name = facts.lower_name();
        if let Some(hint) = SCREENSHOT_NAME_HINTS.iter().find(|h| name.contains(*h)) {
            return Some(format!("file name contains \"{hint}\""));
        }
        let (width, height) = pixels.dimensions();
        let standard = self
            .thresholds
            .screen_resolutions
            .iter()
            .any(|&[w, h]| (w, h) == (width, height) || (h, w) == (width, height));
        (facts.is_png() && standard).then(|| format!("PNG at display resolution {width}x{height}"))
    }

    fn watermarked(&self, pixels: &PixelBuffer) -> ClassificationResult {
        let t = &self.thresholds;
        let (width, height) = pixels.dimensions();
        let mut evidence = vec![
            "identity payload recovered".to_string(),
            format!("{width}x{height}"),
        ];

        let (case, confidence) =
            if matches_aspect(width, height, CANONICAL_ASPECTS, t.aspect_tolerance) {
                evidence.push("canonical aspect ratio".to_string());
                (ClassificationCase::Watermarked, t.watermark_confidence)
            } else {
                evidence.push(format!(
                    "aspect ratio {:.3} is not canonical; likely cropped",
                    aspect(width, height)
                ));
                if pixels.pixel_count() < t.small_crop_pixels {
                    evidence.push("small cropped region".to_string());
                    (
                        ClassificationCase::WatermarkedAndCropped,
                        t.small_crop_confidence,
                    )
                } else {
                    (ClassificationCase::WatermarkedAndCropped, t.cropped_confidence)
                }
            };

        ClassificationResult {
            case,
            confidence,
            evidence,
            scores: CaseScores::default(),
            metrics: None,
        }
    }
}

/// Long edge over short edge.
fn aspect(width: u32, height: u32) -> f64 {
    let (long, short) = (width.max(height), width.min(height).max(1));
    long as f64 / short as f64
}

fn matches_aspect(width: u32, height: u32, ratios: &[f64], tolerance: f64) -> bool {
    let ratio = aspect(width, height);
    ratios.iter().any(|r| (ratio - r).abs() / r <= tolerance)
}

/// Classify with default thresholds and the thread-local RNG.
pub fn classify(
    pixels: &PixelBuffer,
    file_size: u64,
    file_name: Option<&str>,
    has_payload: bool,
) -> ClassificationResult {
    Classifier::default().classify(pixels, file_size, file_name, has_payload)
}
