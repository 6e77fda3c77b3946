//! Exact and perceptual image identity.
//!
//! - **Content digest**: SHA3-256 of the raw bytes, for exact-match detection.
//! - **Perceptual fingerprint**: 64-bit average hash, for near-duplicate
//!   detection after resampling or recompression.

pub mod content;
pub mod perceptual;

pub use content::{digest, ContentDigest, CONTENT_DIGEST_SIZE};
pub use perceptual::{
    fingerprint, hamming_distance, similarity, PerceptualFingerprint, PerceptualHasher,
    FINGERPRINT_BITS, FINGERPRINT_HEX_LEN,
};
