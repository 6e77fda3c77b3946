//! Perceptual fingerprints for near-duplicate detection.
//!
//! # Algorithm
//!
//! Average hash over an 8x8 luminance grid: the image is area-averaged down
//! to 64 samples, each sample becomes one bit (1 if it is at least the mean
//! luminance), and the bits are packed MSB first into 16 hex characters.
//! Byte-identical images always produce identical fingerprints; resampling and
//! mild recompression move only a few bits.
//!
//! # Usage
//!
//! ```
//! use imprint_core::hash::{similarity, PerceptualHasher};
//! use imprint_core::PixelBuffer;
//!
//! let pixels = PixelBuffer::from_fn(64, 64, |x, _| [(x * 4) as u8, 0, 0, 255]).unwrap();
//! let h1 = PerceptualHasher::default().fingerprint(&pixels);
//! let h2 = PerceptualHasher::default().fingerprint(&pixels);
//! assert_eq!(similarity(Some(&h1), Some(&h2)), Some(100.0));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ImprintError, Result};
use crate::pixels::{luminance, PixelBuffer};

/// Side of the reduced luminance grid.
pub const GRID_SIZE: u32 = 8;

/// Fingerprint size in bits.
pub const FINGERPRINT_BITS: u32 = GRID_SIZE * GRID_SIZE;

/// Fingerprint size in hex characters.
pub const FINGERPRINT_HEX_LEN: usize = (FINGERPRINT_BITS / 4) as usize;

/// 64-bit average hash rendered as 16 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PerceptualFingerprint(String);

impl PerceptualFingerprint {
    /// Build from the packed 64-bit value.
    pub fn from_bits(bits: u64) -> Self {
        Self(hex::encode(bits.to_be_bytes()))
    }

    /// Parse a stored fingerprint.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != FINGERPRINT_HEX_LEN {
            return Err(ImprintError::InvalidFingerprint(format!(
                "expected {FINGERPRINT_HEX_LEN} hex characters, got {}",
                hex_str.len()
            )));
        }
        hex::decode(hex_str)
            .map_err(|e| ImprintError::InvalidFingerprint(format!("Invalid hex string: {e}")))?;
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Packed 64-bit value.
    pub fn bits(&self) -> u64 {
        // Validated on construction.
        u64::from_str_radix(&self.0, 16).unwrap_or_default()
    }

    /// Number of differing bits.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        (self.bits() ^ other.bits()).count_ones()
    }
}

impl TryFrom<String> for PerceptualFingerprint {
    type Error = ImprintError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<PerceptualFingerprint> for String {
    fn from(fp: PerceptualFingerprint) -> Self {
        fp.0
    }
}

impl fmt::Debug for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PerceptualFingerprint({})", self.0)
    }
}

impl fmt::Display for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Average-hash computation.
#[derive(Debug, Clone, Default)]
pub struct PerceptualHasher;

impl PerceptualHasher {
    pub fn new() -> Self {
        Self
    }

    /// Compute the fingerprint of a pixel buffer.
    pub fn fingerprint(&self, pixels: &PixelBuffer) -> PerceptualFingerprint {
        let grid = match pixels.resample(GRID_SIZE, GRID_SIZE) {
            Ok(grid) => grid,
            // GRID_SIZE is non-zero, so resampling cannot fail.
            Err(_) => return PerceptualFingerprint::from_bits(0),
        };

        let lumas: Vec<f64> = grid
            .as_bytes()
            .chunks_exact(4)
            .map(|p| luminance(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect();
        let mean = lumas.iter().sum::<f64>() / lumas.len() as f64;

        let bits = lumas
            .iter()
            .fold(0u64, |acc, &l| (acc << 1) | u64::from(l >= mean));
        PerceptualFingerprint::from_bits(bits)
    }
}

/// Fingerprint with the default hasher.
pub fn fingerprint(pixels: &PixelBuffer) -> PerceptualFingerprint {
    PerceptualHasher::default().fingerprint(pixels)
}

/// Compute Hamming distance between two fingerprints.
///
/// Returns `None` if either is absent.
pub fn hamming_distance(
    a: Option<&PerceptualFingerprint>,
    b: Option<&PerceptualFingerprint>,
) -> Option<u32> {
    Some(a?.hamming_distance(b?))
}

/// Similarity in percent: `100 * (64 - distance) / 64`.
///
/// Returns `None` ("unavailable") when either fingerprint is absent.
pub fn similarity(
    a: Option<&PerceptualFingerprint>,
    b: Option<&PerceptualFingerprint>,
) -> Option<f64> {
    let distance = hamming_distance(a, b)?;
    Some(100.0 * (FINGERPRINT_BITS - distance) as f64 / FINGERPRINT_BITS as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32, cell: u32) -> PixelBuffer {
        PixelBuffer::from_fn(size, size, |x, y| {
            let v = if (x / cell + y / cell) % 2 == 0 { 230 } else { 20 };
            [v, v, v, 255]
        })
        .unwrap()
    }

    #[test]
    fn test_fingerprint_width() {
        let fp = fingerprint(&checkerboard(64, 8));
        assert_eq!(fp.as_str().len(), FINGERPRINT_HEX_LEN);
    }

    #[test]
    fn test_identical_images_distance_zero() {
        let a = checkerboard(64, 8);
        let b = a.clone();
        let (fa, fb) = (fingerprint(&a), fingerprint(&b));
        assert_eq!(hamming_distance(Some(&fa), Some(&fb)), Some(0));
        assert_eq!(similarity(Some(&fa), Some(&fb)), Some(100.0));
    }

    #[test]
    fn test_checkerboard_bits() {
        // 8px cells on a 64px canvas map one cell per grid sample.
        let fp = fingerprint(&checkerboard(64, 8));
        assert_eq!(fp.as_str(), "aa55aa55aa55aa55");
    }

    #[test]
    fn test_inverted_image_is_dissimilar() {
        let a = checkerboard(64, 8);
        let b = PixelBuffer::from_fn(64, 64, |x, y| {
            let [r, g, bl, al] = a.pixel(x, y);
            [255 - r, 255 - g, 255 - bl, al]
        })
        .unwrap();
        let (fa, fb) = (fingerprint(&a), fingerprint(&b));
        assert_eq!(fa.hamming_distance(&fb), 64);
        assert_eq!(similarity(Some(&fa), Some(&fb)), Some(0.0));
    }

    #[test]
    fn test_resized_copy_is_similar() {
        let big = checkerboard(256, 32);
        let small = big.resample(128, 128).unwrap();
        let d = fingerprint(&big).hamming_distance(&fingerprint(&small));
        assert!(d <= 4, "distance {d}");
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = PerceptualFingerprint::from_hex("00000000ffffffff").unwrap();
        let b = PerceptualFingerprint::from_hex("0f0f0f0f0f0f0f0f").unwrap();
        assert_eq!(similarity(Some(&a), Some(&b)), similarity(Some(&b), Some(&a)));
    }

    #[test]
    fn test_similarity_unavailable() {
        let a = PerceptualFingerprint::from_bits(1);
        assert_eq!(similarity(Some(&a), None), None);
        assert_eq!(similarity(None, None), None);
    }

    #[test]
    fn test_from_hex_validation() {
        assert!(PerceptualFingerprint::from_hex("deadbeefcafebabe").is_ok());
        assert!(PerceptualFingerprint::from_hex("deadbeef").is_err());
        assert!(PerceptualFingerprint::from_hex("zzzzzzzzzzzzzzzz").is_err());
        assert_eq!(
            PerceptualFingerprint::from_hex("DEADBEEFCAFEBABE").unwrap().as_str(),
            "deadbeefcafebabe"
        );
    }
}
