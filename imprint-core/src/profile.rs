//! Tunable thresholds for every heuristic in the engine.
//!
//! All scoring constants live here, grouped per component, so the parsing and
//! signal-extraction code never carries magic numbers. The values were chosen
//! empirically against historical encoder versions of the listed platforms;
//! they are versioned and replaceable as a whole via [`AnalysisProfile::from_json`].
//!
//! ```
//! use imprint_core::AnalysisProfile;
//!
//! let profile = AnalysisProfile::from_json(r#"{ "diff": { "changed_threshold": 30.0 } }"#).unwrap();
//! assert_eq!(profile.diff.changed_threshold, 30.0);
//! assert_eq!(profile.diff.grid, 4);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inspect::ChromaSubsampling;

/// Version tag of the built-in threshold tables.
pub const PROFILE_VERSION: &str = "2024.1";

/// Complete configuration of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisProfile {
    /// Free-form version label, carried into verdicts for auditability.
    pub version: String,
    pub codec: CodecConfig,
    pub diff: DiffConfig,
    pub attribution: AttributionProfile,
    pub classification: ClassificationThresholds,
    pub verdict: VerdictThresholds,
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        Self {
            version: PROFILE_VERSION.to_string(),
            codec: CodecConfig::default(),
            diff: DiffConfig::default(),
            attribution: AttributionProfile::default(),
            classification: ClassificationThresholds::default(),
            verdict: VerdictThresholds::default(),
        }
    }
}

impl AnalysisProfile {
    /// Parse a profile from JSON. Missing sections and fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Bit codec layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Number of equal segments that each carry a full copy of the payload.
    pub repetitions: usize,
    /// Characters decoded per candidate window during extraction.
    pub window_chars: usize,
    /// Matches needed for `VeryHigh` extraction confidence.
    pub very_high_matches: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            repetitions: 12,
            window_chars: 250,
            very_high_matches: 3,
        }
    }
}

/// Pixel diff engine grid and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Both images are resampled to `canvas x canvas` before comparison.
    pub canvas: u32,
    /// Region grid is `grid x grid` cells.
    pub grid: u32,
    /// Mean absolute RGB difference above which a pixel counts as changed.
    pub changed_threshold: f64,
    /// Cell divergence bands for low / medium / high hot regions.
    pub low_band: f64,
    pub medium_band: f64,
    pub high_band: f64,
    /// `pixel_similarity = max(0, 100 - changed_pct * similarity_weight)`.
    pub similarity_weight: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            canvas: 256,
            grid: 4,
            changed_threshold: 25.0,
            low_band: 8.0,
            medium_band: 20.0,
            high_band: 40.0,
            similarity_weight: 2.0,
        }
    }
}

/// Quantization and structure signature of one re-encoding platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSignature {
    pub name: String,
    /// Kind of service, e.g. "messaging app".
    pub category: String,
    /// Inclusive range of the luminance DC quantizer.
    pub dc_range: [u16; 2],
    pub dc_points: i32,
    /// Inclusive range of the mean luminance AC quantizer.
    pub ac_mean_range: [f64; 2],
    pub ac_points: i32,
    /// Chroma subsampling the platform's encoder emits.
    pub subsampling: Option<ChromaSubsampling>,
    pub subsampling_points: i32,
    /// Deducted when the observed subsampling contradicts this platform and
    /// another platform expects the observed mode.
    pub subsampling_penalty: i32,
    /// Canonical long-edge sizes the platform resizes to.
    pub long_edges: Vec<u32>,
    pub dimension_points: i32,
    pub no_exif_points: i32,
}

impl PlatformSignature {
    fn standard(
        name: &str,
        category: &str,
        dc_range: [u16; 2],
        ac_mean_range: [f64; 2],
        subsampling: ChromaSubsampling,
        long_edges: &[u32],
    ) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            dc_range,
            dc_points: 30,
            ac_mean_range,
            ac_points: 10,
            subsampling: Some(subsampling),
            subsampling_points: 15,
            subsampling_penalty: 15,
            long_edges: long_edges.to_vec(),
            dimension_points: 25,
            no_exif_points: 10,
        }
    }
}

/// Editor keyword matched case-insensitively in comment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorKeyword {
    pub keyword: String,
    pub label: String,
}

/// PNG physical density written by a known screenshot tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotDensity {
    /// Accepted pixels-per-meter values (pHYs unit 1).
    pub pixels_per_meter: Vec<u32>,
    pub label: String,
}

/// Platform attribution scoring table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionProfile {
    /// Minimum score for a named platform attribution.
    pub min_score: i32,
    /// Deducted from every platform when Exif metadata is present.
    pub exif_penalty: i32,
    pub platforms: Vec<PlatformSignature>,
    pub editor_keywords: Vec<EditorKeyword>,
    pub screenshot_densities: Vec<ScreenshotDensity>,
}

impl Default for AttributionProfile {
    fn default() -> Self {
        use ChromaSubsampling::{Yuv420, Yuv444};

        let platforms = vec![
            PlatformSignature::standard(
                "WhatsApp",
                "messaging app",
                [5, 7],
                [18.0, 27.0],
                Yuv420,
                &[1280, 1600, 2560],
            ),
            PlatformSignature::standard(
                "Instagram",
                "photo-sharing app",
                [8, 11],
                [26.0, 40.0],
                Yuv420,
                &[1080, 1350],
            ),
            PlatformSignature::standard(
                "Telegram",
                "chat app",
                [3, 5],
                [11.0, 18.0],
                Yuv420,
                &[1280, 2560],
            ),
            PlatformSignature::standard(
                "Facebook",
                "social network",
                [6, 9],
                [16.0, 33.0],
                Yuv420,
                &[720, 960, 2048],
            ),
            PlatformSignature::standard(
                "X (Twitter)",
                "microblog",
                [2, 4],
                [11.0, 18.0],
                Yuv444,
                &[680, 1200, 2048, 4096],
            ),
            PlatformSignature::standard(
                "Snapchat",
                "ephemeral-photo app",
                [10, 14],
                [36.0, 50.0],
                Yuv420,
                &[1920],
            ),
        ];

        let editor_keywords = [
            ("gimp", "GIMP"),
            ("photoshop", "Adobe Photoshop"),
            ("canva", "Canva"),
            ("snapseed", "Snapseed"),
        ]
        .into_iter()
        .map(|(keyword, label)| EditorKeyword {
            keyword: keyword.to_string(),
            label: label.to_string(),
        })
        .collect();

        let screenshot_densities = vec![
            ScreenshotDensity {
                pixels_per_meter: vec![5669, 5670],
                label: "macOS Screenshot".to_string(),
            },
            ScreenshotDensity {
                pixels_per_meter: vec![3779, 3780],
                label: "Windows Snipping Tool".to_string(),
            },
        ];

        Self {
            min_score: 50,
            exif_penalty: 25,
            platforms,
            editor_keywords,
            screenshot_densities,
        }
    }
}

/// Classification signal thresholds and rule weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationThresholds {
    /// Random pixel samples per statistic.
    pub sample_count: usize,
    /// Coarse grid used for block smoothness (grid x grid cells).
    pub block_grid: u32,
    /// Side of the window sampled inside each grid cell.
    pub block_size: u32,

    /// A case scoring at least this wins outright.
    pub high_confidence_score: i32,
    /// Top two scores closer than this are "mixed signals".
    pub close_margin: i32,
    pub mixed_confidence_cap: u8,
    pub reduced_confidence_cap: u8,
    pub max_confidence: u8,

    // Synthetic-origin rules.
    pub png_container_points: i32,
    pub grid64_dimension_points: i32,
    pub smooth_block_variance: f64,
    pub smooth_block_ratio: f64,
    pub smooth_block_points: i32,
    pub low_noise_level: f64,
    pub low_noise_points: i32,
    pub high_correlation: f64,
    pub high_correlation_points: i32,
    pub uniform_texture_ratio: f64,
    pub uniform_texture_points: i32,
    pub coherent_edge_ratio: f64,
    pub coherent_edge_points: i32,
    pub low_entropy_bits: f64,
    pub low_entropy_points: i32,

    // Device-capture rules.
    pub high_noise_level: f64,
    pub high_noise_points: i32,
    pub high_entropy_bits: f64,
    pub high_entropy_points: i32,
    pub camera_name_points: i32,
    pub rich_bytes_per_pixel: f64,
    pub rich_bytes_points: i32,
    pub camera_megapixels: f64,
    pub camera_megapixel_points: i32,
    pub camera_aspect_points: i32,
    pub textured_ratio: f64,
    pub textured_points: i32,

    // Web-reencoded rules.
    pub lean_bytes_per_pixel: f64,
    pub lean_bytes_points: i32,
    pub social_long_edges: Vec<u32>,
    pub social_edge_points: i32,
    pub clustered_ratio: f64,
    pub clustered_points: i32,
    pub download_name_points: i32,
    pub jpeg_container_points: i32,
    pub blocky_ratio_range: [f64; 2],
    pub blocky_points: i32,

    // Watermark short-circuit.
    pub watermark_confidence: u8,
    pub cropped_confidence: u8,
    pub small_crop_pixels: usize,
    pub small_crop_confidence: u8,
    pub aspect_tolerance: f64,

    /// Standard display resolutions used to recognise screen captures.
    pub screen_resolutions: Vec<[u32; 2]>,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            sample_count: 4000,
            block_grid: 16,
            block_size: 8,

            high_confidence_score: 60,
            close_margin: 10,
            mixed_confidence_cap: 55,
            reduced_confidence_cap: 70,
            max_confidence: 95,

            png_container_points: 15,
            grid64_dimension_points: 20,
            smooth_block_variance: 12.0,
            smooth_block_ratio: 0.55,
            smooth_block_points: 15,
            low_noise_level: 1.5,
            low_noise_points: 15,
            high_correlation: 0.97,
            high_correlation_points: 10,
            uniform_texture_ratio: 0.92,
            uniform_texture_points: 10,
            coherent_edge_ratio: 0.8,
            coherent_edge_points: 10,
            low_entropy_bits: 5.0,
            low_entropy_points: 10,

            high_noise_level: 4.0,
            high_noise_points: 25,
            high_entropy_bits: 7.2,
            high_entropy_points: 15,
            camera_name_points: 20,
            rich_bytes_per_pixel: 0.35,
            rich_bytes_points: 15,
            camera_megapixels: 8.0,
            camera_megapixel_points: 15,
            camera_aspect_points: 10,
            textured_ratio: 0.75,
            textured_points: 10,

            lean_bytes_per_pixel: 0.15,
            lean_bytes_points: 20,
            social_long_edges: vec![640, 720, 1080, 1200, 1280, 1600, 2048],
            social_edge_points: 20,
            clustered_ratio: 0.65,
            clustered_points: 10,
            download_name_points: 15,
            jpeg_container_points: 5,
            blocky_ratio_range: [0.3, 0.55],
            blocky_points: 10,

            watermark_confidence: 95,
            cropped_confidence: 80,
            small_crop_pixels: 250_000,
            small_crop_confidence: 60,
            aspect_tolerance: 0.02,

            screen_resolutions: vec![
                [1280, 720],
                [1366, 768],
                [1440, 900],
                [1536, 864],
                [1680, 1050],
                [1920, 1080],
                [1920, 1200],
                [2560, 1440],
                [2560, 1600],
                [2880, 1800],
                [3024, 1964],
                [3456, 2234],
                [3840, 2160],
                [1170, 2532],
                [1179, 2556],
                [1290, 2796],
                [1080, 2400],
            ],
        }
    }
}

/// Weights that turn comparison findings into a tamper verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    /// Tamper score at or above which the candidate is reported as tampered.
    pub tamper_score: i32,
    /// Confidence ceiling for any verdict short of an exact digest match.
    pub max_confidence: u8,
    /// Perceptual similarity below this is a moderate signal.
    pub similarity_moderate: f64,
    pub similarity_moderate_points: i32,
    /// Perceptual similarity below this is a strong signal.
    pub similarity_strong: f64,
    pub similarity_strong_points: i32,
    pub editor_points: i32,
    pub changed_pct: f64,
    pub changed_points: i32,
    pub high_region_points: i32,
    pub medium_region_points: i32,
    pub region_points_cap: i32,
    pub brightness_shift: f64,
    pub color_points: i32,
    pub dimension_points: i32,
    pub watermark_missing_points: i32,
    pub watermark_mismatch_points: i32,
    /// Credited back when a platform re-encode explains byte differences.
    pub platform_credit: i32,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            tamper_score: 40,
            max_confidence: 95,
            similarity_moderate: 95.0,
            similarity_moderate_points: 20,
            similarity_strong: 80.0,
            similarity_strong_points: 40,
            editor_points: 40,
            changed_pct: 5.0,
            changed_points: 30,
            high_region_points: 15,
            medium_region_points: 5,
            region_points_cap: 30,
            brightness_shift: 12.0,
            color_points: 10,
            dimension_points: 10,
            watermark_missing_points: 15,
            watermark_mismatch_points: 50,
            platform_credit: 10,
        }
    }
}
