//! Redundant least-significant-bit embedding over the RGB channels.
//!
//! The RGB sample stream (alpha skipped) is cut into `repetitions` equal
//! segments, each a multiple of 8 samples long. Every segment starts with the
//! payload bits and repeats them cyclically until the segment is full, so a
//! single surviving segment is enough to recover the record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::payload::{is_printable, Payload, MAGIC, TERMINATOR};
use crate::error::{ImprintError, Result};
use crate::pixels::{PixelBuffer, CHANNELS};
use crate::profile::CodecConfig;

/// RGB samples per pixel that carry payload bits.
const CARRIER_CHANNELS: usize = 3;

/// How strongly an extraction is corroborated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtractionConfidence {
    /// At least one window decoded cleanly.
    High,
    /// Several independent copies agree.
    VeryHigh,
}

/// A payload recovered from pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub payload: Payload,
    /// Windows that decoded to this payload.
    pub matches: usize,
    /// Windows that decoded to any payload.
    pub candidates: usize,
    pub confidence: ExtractionConfidence,
}

/// LSB embedder/extractor.
#[derive(Debug, Clone, Default)]
pub struct LsbCodec {
    config: CodecConfig,
}

impl LsbCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Bits available to one copy of the payload in a buffer of these dimensions.
    pub fn segment_capacity(&self, pixels: &PixelBuffer) -> usize {
        let samples = pixels.pixel_count() * CARRIER_CHANNELS;
        (samples / self.config.repetitions.max(1)) / 8 * 8
    }

    /// Write `payload` into a copy of `pixels`.
    ///
    /// # Errors
    ///
    /// `PayloadTooLong` when the serialized payload is longer than the
    /// extraction window, `PayloadTooLarge` when one copy does not fit in a
    /// segment.
    pub fn embed(&self, pixels: &PixelBuffer, payload: &Payload) -> Result<PixelBuffer> {
        let chars = payload.serialize().len();
        if chars > self.config.window_chars {
            return Err(ImprintError::PayloadTooLong {
                chars,
                window: self.config.window_chars,
            });
        }

        let bits = payload.to_bits();
        let segment = self.segment_capacity(pixels);
        if bits.len() > segment {
            return Err(ImprintError::PayloadTooLarge {
                bits: bits.len(),
                capacity: segment,
            });
        }

        let mut out = pixels.clone();
        let data = out.as_bytes_mut();
        for seg in 0..self.config.repetitions.max(1) {
            let start = seg * segment;
            for i in 0..segment {
                let idx = sample_index(start + i);
                data[idx] = (data[idx] & 0xFE) | bits[i % bits.len()];
            }
        }

        debug!(
            repetitions = self.config.repetitions,
            segment_bits = segment,
            payload_bits = bits.len(),
            "Embedded payload"
        );
        Ok(out)
    }

    /// Scan every byte-aligned offset for a payload window.
    ///
    /// Returns `None` when no window decodes; never fails.
    #[instrument(skip_all, fields(width = pixels.width(), height = pixels.height()))]
    pub fn extract(&self, pixels: &PixelBuffer) -> Option<Extraction> {
        let reader = BitReader::new(pixels);
        let magic = MAGIC.as_bytes();
        let mut found: HashMap<String, (usize, usize, Payload)> = HashMap::new();
        let mut candidates = 0usize;

        let mut offset = 0usize;
        while offset + magic.len() * 8 <= reader.len() {
            if reader.byte_at(offset) == magic[0] && reader.starts_with(offset, magic) {
                if let Some(payload) = self.decode_window(&reader, offset) {
                    candidates += 1;
                    let entry = found
                        .entry(payload.serialize())
                        .or_insert((0, offset, payload));
                    entry.0 += 1;
                }
            }
            offset += 8;
        }

        // Most frequent record wins; earliest occurrence breaks ties.
        let (matches, first_offset, payload) = found
            .into_values()
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))?;

        let confidence = if matches >= self.config.very_high_matches {
            ExtractionConfidence::VeryHigh
        } else {
            ExtractionConfidence::High
        };
        debug!(
            matches,
            candidates,
            first_offset,
            confidence = ?confidence,
            "Recovered payload"
        );

        Some(Extraction {
            payload,
            matches,
            candidates,
            confidence,
        })
    }

    fn decode_window(&self, reader: &BitReader<'_>, offset: usize) -> Option<Payload> {
        let mut text = String::with_capacity(self.config.window_chars);
        let mut pos = offset;
        while text.len() < self.config.window_chars && pos + 8 <= reader.len() {
            let c = reader.byte_at(pos) as char;
            if !is_printable(c) {
                break;
            }
            text.push(c);
            pos += 8;
        }

        if text.len() < MAGIC.len() || !text[MAGIC.len()..].contains(TERMINATOR) {
            return None;
        }
        Payload::parse(&text).ok()
    }
}

/// Embed with the default layout.
pub fn embed(pixels: &PixelBuffer, payload: &Payload) -> Result<PixelBuffer> {
    LsbCodec::default().embed(pixels, payload)
}

/// Extract with the default layout.
pub fn extract(pixels: &PixelBuffer) -> Option<Extraction> {
    LsbCodec::default().extract(pixels)
}

/// Byte index of the `k`-th RGB sample.
fn sample_index(k: usize) -> usize {
    (k / CARRIER_CHANNELS) * CHANNELS + k % CARRIER_CHANNELS
}

/// Lazy view of the low-bit stream, so extraction allocates nothing per bit.
struct BitReader<'a> {
    data: &'a [u8],
    len: usize,
}

impl<'a> BitReader<'a> {
    fn new(pixels: &'a PixelBuffer) -> Self {
        Self {
            data: pixels.as_bytes(),
            len: pixels.pixel_count() * CARRIER_CHANNELS,
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn bit(&self, k: usize) -> u8 {
        self.data[sample_index(k)] & 1
    }

    /// Eight bits starting at `k`, MSB first. Caller keeps `k + 8 <= len`.
    fn byte_at(&self, k: usize) -> u8 {
        (0..8).fold(0u8, |acc, i| (acc << 1) | self.bit(k + i))
    }

    fn starts_with(&self, k: usize, bytes: &[u8]) -> bool {
        k + bytes.len() * 8 <= self.len
            && bytes
                .iter()
                .enumerate()
                .all(|(i, &b)| self.byte_at(k + i * 8) == b)
    }
}
