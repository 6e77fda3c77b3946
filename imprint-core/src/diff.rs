//! Pixel and region level comparison of two images.
//!
//! Both inputs are area-resampled onto the same square canvas first, so the
//! report does not depend on either image's resolution.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::pixels::{luminance, PixelBuffer};
use crate::profile::DiffConfig;

const ROW_NAMES: [&str; 4] = ["top", "upper-middle", "lower-middle", "bottom"];
const COL_NAMES: [&str; 4] = ["left", "center-left", "center-right", "right"];

/// Severity of a finding or hot region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Average divergence of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDiff {
    pub row: usize,
    pub col: usize,
    /// e.g. "top-left", "lower-middle-center-right".
    pub name: String,
    /// Mean per-pixel divergence within the cell, 0-255.
    pub score: f64,
    /// `None` below the low band.
    pub severity: Option<Severity>,
}

/// Result of [`PixelDiffer::diff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Mean per-pixel divergence, 0-255.
    pub avg_diff: f64,
    /// Percentage of pixels above the changed threshold.
    pub changed_pct: f64,
    /// Every grid cell in row-major order.
    pub regions: Vec<RegionDiff>,
    /// Cells at or above the low band, most severe first.
    pub hot_regions: Vec<RegionDiff>,
    /// Mean luminance of the candidate minus the original.
    pub brightness_shift: f64,
    /// Mean R, G, B of the candidate minus the original.
    pub channel_shifts: [f64; 3],
    pub pixel_similarity: f64,
}

/// `max(0, 100 - changed_pct * weight)`. Non-increasing in `changed_pct`.
pub fn pixel_similarity(changed_pct: f64, weight: f64) -> f64 {
    (100.0 - changed_pct * weight).max(0.0)
}

/// Grid diff over a fixed canvas.
#[derive(Debug, Clone, Default)]
pub struct PixelDiffer {
    config: DiffConfig,
}

impl PixelDiffer {
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compare `original` and `candidate`.
    ///
    /// Fails only when the configured canvas or grid is zero.
    #[instrument(skip_all)]
    pub fn diff(&self, original: &PixelBuffer, candidate: &PixelBuffer) -> Result<DiffReport> {
        let canvas = self.config.canvas;
        let grid = self.config.grid.clamp(1, canvas.max(1));
        let a = original.resample(canvas, canvas)?;
        let b = candidate.resample(canvas, canvas)?;

        let cells = (grid * grid) as usize;
        let mut cell_sums = vec![0.0f64; cells];
        let mut cell_counts = vec![0u64; cells];
        let mut total = 0.0;
        let mut changed = 0u64;
        let mut luma_delta = 0.0;
        let mut channel_delta = [0.0f64; 3];

        for (i, (pa, pb)) in a
            .as_bytes()
            .chunks_exact(4)
            .zip(b.as_bytes().chunks_exact(4))
            .enumerate()
        {
            let x = (i % canvas as usize) as u32;
            let y = (i / canvas as usize) as u32;

            let mut divergence = 0.0;
            for c in 0..3 {
                let delta = pb[c] as f64 - pa[c] as f64;
                divergence += delta.abs();
                channel_delta[c] += delta;
            }
            divergence /= 3.0;

            total += divergence;
            if divergence > self.config.changed_threshold {
                changed += 1;
            }
            luma_delta += luminance(pb[0] as f64, pb[1] as f64, pb[2] as f64)
                - luminance(pa[0] as f64, pa[1] as f64, pa[2] as f64);

            let cell = ((y * grid / canvas) * grid + x * grid / canvas) as usize;
            cell_sums[cell] += divergence;
            cell_counts[cell] += 1;
        }

        let pixels = (canvas as f64) * (canvas as f64);
        let changed_pct = 100.0 * changed as f64 / pixels;

        let regions: Vec<RegionDiff> = (0..cells)
            .map(|cell| {
                let (row, col) = (cell / grid as usize, cell % grid as usize);
                let score = cell_sums[cell] / cell_counts[cell].max(1) as f64;
                RegionDiff {
                    row,
                    col,
                    name: region_name(row, col, grid as usize),
                    score,
                    severity: self.severity(score),
                }
            })
            .collect();

        let mut hot_regions: Vec<RegionDiff> = regions
            .iter()
            .filter(|r| r.severity.is_some())
            .cloned()
            .collect();
        hot_regions.sort_by(|l, r| {
            r.severity
                .cmp(&l.severity)
                .then(r.score.total_cmp(&l.score))
        });

        let report = DiffReport {
            avg_diff: total / pixels,
            changed_pct,
            regions,
            hot_regions,
            brightness_shift: luma_delta / pixels,
            channel_shifts: channel_delta.map(|d| d / pixels),
            pixel_similarity: pixel_similarity(changed_pct, self.config.similarity_weight),
        };
        debug!(
            avg_diff = report.avg_diff,
            changed_pct = report.changed_pct,
            hot_regions = report.hot_regions.len(),
            "Pixel diff"
        );
        Ok(report)
    }

    fn severity(&self, score: f64) -> Option<Severity> {
        if score >= self.config.high_band {
            Some(Severity::High)
        } else if score >= self.config.medium_band {
            Some(Severity::Medium)
        } else if score >= self.config.low_band {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

/// Row and column names for the 4x4 grid; other grids fall back to indices.
fn region_name(row: usize, col: usize, grid: usize) -> String {
    if grid == ROW_NAMES.len() {
        format!("{}-{}", ROW_NAMES[row], COL_NAMES[col])
    } else {
        format!("r{row}c{col}")
    }
}

/// Diff with the default configuration.
pub fn diff(original: &PixelBuffer, candidate: &PixelBuffer) -> Result<DiffReport> {
    PixelDiffer::default().diff(original, candidate)
}
