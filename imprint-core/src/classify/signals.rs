//! Pixel statistics feeding the classifier.
//!
//! Every statistic is computed over a fixed number of randomly sampled pixels
//! (or a fixed grid of small windows), so cost does not grow with resolution.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pixels::PixelBuffer;
use crate::profile::ClassificationThresholds;

/// Coarse brightness bins for the clustering ratio.
const BRIGHTNESS_BINS: usize = 16;

/// Bins summed by the clustering ratio.
const DOMINANT_BINS: usize = 3;

/// Adjacent gradients within this many luma levels count as coherent.
const GRADIENT_TOLERANCE: f64 = 2.0;

/// Measured signals, all retained in the classification result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    /// Mean Pearson correlation of the R/G, G/B and R/B channel pairs.
    pub channel_correlation: f64,
    /// Share of sampled 3x3 neighbourhoods with a uniform binary pattern
    /// (at most two 0/1 transitions around the ring).
    pub texture_uniformity: f64,
    /// Share of grid windows whose luma variance is below the smoothness threshold.
    pub smooth_block_ratio: f64,
    /// Share of sampled pixels whose horizontal gradient matches the next one.
    pub edge_coherence: f64,
    /// Mean per-channel Shannon entropy of the sampled histogram, in bits.
    pub entropy_bits: f64,
    /// Share of samples falling in the three most populated brightness bins.
    pub clustering_ratio: f64,
    /// Median absolute Laplacian residual of luma.
    pub noise_level: f64,
    /// File size over pixel count; `None` when the size is unknown.
    pub bytes_per_pixel: Option<f64>,
    pub megapixels: f64,
    pub samples: usize,
}

impl SignalMetrics {
    /// Sample `pixels` and measure every signal.
    pub fn measure<R: Rng + ?Sized>(
        pixels: &PixelBuffer,
        file_size: u64,
        thresholds: &ClassificationThresholds,
        rng: &mut R,
    ) -> Self {
        let (width, height) = pixels.dimensions();
        let count = thresholds.sample_count.max(1);

        let points: Vec<(u32, u32)> = (0..count)
            .map(|_| (rng.gen_range(0..width), rng.gen_range(0..height)))
            .collect();
        // Neighbourhood statistics need a one-pixel margin.
        let interior: Vec<(u32, u32)> = if width >= 3 && height >= 3 {
            (0..count)
                .map(|_| (rng.gen_range(1..width - 1), rng.gen_range(1..height - 1)))
                .collect()
        } else {
            Vec::new()
        };

        let pixel_count = pixels.pixel_count() as f64;
        Self {
            channel_correlation: channel_correlation(pixels, &points),
            texture_uniformity: texture_uniformity(pixels, &interior),
            smooth_block_ratio: smooth_block_ratio(pixels, thresholds),
            edge_coherence: edge_coherence(pixels, &points),
            entropy_bits: channel_entropy(pixels, &points),
            clustering_ratio: clustering_ratio(pixels, &points),
            noise_level: noise_level(pixels, &interior),
            bytes_per_pixel: (file_size > 0).then(|| file_size as f64 / pixel_count),
            megapixels: pixel_count / 1_000_000.0,
            samples: points.len(),
        }
    }

    /// Evidence lines, one per metric.
    pub fn evidence(&self) -> Vec<String> {
        let mut lines = vec![
            format!("channel correlation {:.3}", self.channel_correlation),
            format!("texture uniformity {:.3}", self.texture_uniformity),
            format!("smooth block ratio {:.3}", self.smooth_block_ratio),
            format!("edge coherence {:.3}", self.edge_coherence),
            format!("entropy {:.2} bits", self.entropy_bits),
            format!("brightness clustering {:.3}", self.clustering_ratio),
            format!("noise level {:.2}", self.noise_level),
        ];
        match self.bytes_per_pixel {
            Some(bpp) => lines.push(format!("{bpp:.3} bytes per pixel")),
            None => lines.push("bytes per pixel unavailable".to_string()),
        }
        lines.push(format!("{:.1} megapixels", self.megapixels));
        lines
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let (mx, my) = (xs.iter().sum::<f64>() / n, ys.iter().sum::<f64>() / n);
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    match (vx > 0.0, vy > 0.0) {
        (true, true) => cov / (vx.sqrt() * vy.sqrt()),
        // Two flat channels move together trivially.
        (false, false) => 1.0,
        _ => 0.0,
    }
}

fn channel_correlation(pixels: &PixelBuffer, points: &[(u32, u32)]) -> f64 {
    let mut channels = [Vec::new(), Vec::new(), Vec::new()];
    for &(x, y) in points {
        let p = pixels.pixel(x, y);
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(p[c] as f64);
        }
    }
    let [r, g, b] = &channels;
    (pearson(r, g) + pearson(g, b) + pearson(r, b)) / 3.0
}

/// Ring of 8 neighbours, clockwise from the top-left.
const RING: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

fn texture_uniformity(pixels: &PixelBuffer, interior: &[(u32, u32)]) -> f64 {
    if interior.is_empty() {
        return 0.0;
    }
    let uniform = interior
        .iter()
        .filter(|&&(x, y)| {
            let center = pixels.luma(x, y);
            let bits: Vec<bool> = RING
                .iter()
                .map(|&(dx, dy)| {
                    pixels.luma((x as i32 + dx) as u32, (y as i32 + dy) as u32) >= center
                })
                .collect();
            let transitions = (0..bits.len())
                .filter(|&i| bits[i] != bits[(i + 1) % bits.len()])
                .count();
            transitions <= 2
        })
        .count();
    uniform as f64 / interior.len() as f64
}

fn smooth_block_ratio(pixels: &PixelBuffer, thresholds: &ClassificationThresholds) -> f64 {
    let (width, height) = pixels.dimensions();
    let grid = thresholds.block_grid.max(1);
    let size = thresholds.block_size.max(1).min(width).min(height);

    let mut smooth = 0usize;
    let mut total = 0usize;
    for gy in 0..grid {
        for gx in 0..grid {
            // Window centred in the grid cell, clamped inside the image.
            let cx = ((2 * gx + 1) as u64 * width as u64 / (2 * grid) as u64) as u32;
            let cy = ((2 * gy + 1) as u64 * height as u64 / (2 * grid) as u64) as u32;
            let x0 = cx.saturating_sub(size / 2).min(width - size);
            let y0 = cy.saturating_sub(size / 2).min(height - size);

            let lumas: Vec<f64> = (y0..y0 + size)
                .flat_map(|y| (x0..x0 + size).map(move |x| (x, y)))
                .map(|(x, y)| pixels.luma(x, y))
                .collect();
            let n = lumas.len() as f64;
            let mean = lumas.iter().sum::<f64>() / n;
            let variance = lumas.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;

            total += 1;
            if variance < thresholds.smooth_block_variance {
                smooth += 1;
            }
        }
    }
    smooth as f64 / total.max(1) as f64
}

fn edge_coherence(pixels: &PixelBuffer, points: &[(u32, u32)]) -> f64 {
    let width = pixels.width();
    if width < 3 {
        return 0.0;
    }
    let mut coherent = 0usize;
    let mut measured = 0usize;
    for &(x, y) in points {
        let x = x.min(width - 3);
        let (l0, l1, l2) = (pixels.luma(x, y), pixels.luma(x + 1, y), pixels.luma(x + 2, y));
        let (g1, g2) = ((l1 - l0).abs(), (l2 - l1).abs());
        measured += 1;
        if (g1 - g2).abs() <= GRADIENT_TOLERANCE {
            coherent += 1;
        }
    }
    coherent as f64 / measured.max(1) as f64
}

fn shannon_entropy(histogram: &[u32]) -> f64 {
    let total: u32 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn channel_entropy(pixels: &PixelBuffer, points: &[(u32, u32)]) -> f64 {
    let mut histograms = [[0u32; 256]; 3];
    for &(x, y) in points {
        let p = pixels.pixel(x, y);
        for (c, histogram) in histograms.iter_mut().enumerate() {
            histogram[p[c] as usize] += 1;
        }
    }
    histograms.iter().map(|h| shannon_entropy(h)).sum::<f64>() / 3.0
}

fn clustering_ratio(pixels: &PixelBuffer, points: &[(u32, u32)]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let mut bins = [0usize; BRIGHTNESS_BINS];
    for &(x, y) in points {
        let bin = (pixels.luma(x, y) as usize * BRIGHTNESS_BINS / 256).min(BRIGHTNESS_BINS - 1);
        bins[bin] += 1;
    }
    bins.sort_unstable_by(|a, b| b.cmp(a));
    bins[..DOMINANT_BINS].iter().sum::<usize>() as f64 / points.len() as f64
}

fn noise_level(pixels: &PixelBuffer, interior: &[(u32, u32)]) -> f64 {
    let mut residuals: Vec<f64> = interior
        .iter()
        .map(|&(x, y)| {
            let neighbours = pixels.luma(x - 1, y)
                + pixels.luma(x + 1, y)
                + pixels.luma(x, y - 1)
                + pixels.luma(x, y + 1);
            (pixels.luma(x, y) - neighbours / 4.0).abs()
        })
        .collect();
    if residuals.is_empty() {
        return 0.0;
    }
    residuals.sort_unstable_by(f64::total_cmp);
    residuals[residuals.len() / 2]
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn measure(pixels: &PixelBuffer) -> SignalMetrics {
        let mut rng = StdRng::seed_from_u64(7);
        SignalMetrics::measure(pixels, 0, &ClassificationThresholds::default(), &mut rng)
    }

    /// Deterministic pseudo-noise in 0..=255.
    fn noise(x: u32, y: u32, salt: u32) -> u8 {
        let mut h = x.wrapping_mul(0x9E37_79B1)
            ^ y.wrapping_mul(0x85EB_CA77).rotate_left(13)
            ^ salt.wrapping_mul(0xC2B2_AE3D).rotate_left(7);
        h ^= h >> 16;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        h = h.wrapping_mul(0xC2B2_AE35);
        h ^= h >> 16;
        (h >> 8) as u8
    }

    #[test]
    fn test_flat_image() {
        let flat = PixelBuffer::filled(64, 64, [90, 90, 90, 255]).unwrap();
        let m = measure(&flat);
        assert_eq!(m.channel_correlation, 1.0);
        assert_eq!(m.texture_uniformity, 1.0);
        assert_eq!(m.smooth_block_ratio, 1.0);
        assert_eq!(m.edge_coherence, 1.0);
        assert_eq!(m.entropy_bits, 0.0);
        assert_eq!(m.clustering_ratio, 1.0);
        assert_eq!(m.noise_level, 0.0);
        assert_eq!(m.bytes_per_pixel, None);
    }

    #[test]
    fn test_noisy_image() {
        let noisy = PixelBuffer::from_fn(128, 128, |x, y| {
            [noise(x, y, 1), noise(x, y, 2), noise(x, y, 3), 255]
        })
        .unwrap();
        let m = measure(&noisy);
        assert!(m.entropy_bits > 7.0, "entropy {}", m.entropy_bits);
        assert!(m.noise_level > 10.0, "noise {}", m.noise_level);
        assert!(m.channel_correlation.abs() < 0.2);
        assert!(m.smooth_block_ratio < 0.1);
    }

    #[test]
    fn test_tiny_image_does_not_panic() {
        let tiny = PixelBuffer::filled(1, 2, [1, 2, 3, 255]).unwrap();
        let m = measure(&tiny);
        assert_eq!(m.noise_level, 0.0);
        assert_eq!(m.texture_uniformity, 0.0);
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let img = PixelBuffer::from_fn(100, 80, |x, y| [noise(x, y, 9), 40, 200, 255]).unwrap();
        assert_eq!(measure(&img), measure(&img));
    }

    #[test]
    fn test_entropy_of_uniform_histogram() {
        let h = [1u32; 256];
        assert!((shannon_entropy(&h) - 8.0).abs() < 1e-9);
    }
}
