//! Owned RGBA pixel buffers.
//!
//! The core never decodes image formats itself. Callers hand over decoded
//! pixels as a [`PixelBuffer`], which guarantees non-zero dimensions and a
//! byte length of exactly `4 * width * height`.

use serde::{Deserialize, Serialize};

use crate::error::{ImprintError, Result};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Decoded raster image with 8-bit RGBA samples in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPixelBuffer", into = "RawPixelBuffer")]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct RawPixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl TryFrom<RawPixelBuffer> for PixelBuffer {
    type Error = ImprintError;

    fn try_from(raw: RawPixelBuffer) -> Result<Self> {
        Self::from_rgba(raw.width, raw.height, raw.data)
    }
}

impl From<PixelBuffer> for RawPixelBuffer {
    fn from(buffer: PixelBuffer) -> Self {
        Self {
            width: buffer.width,
            height: buffer.height,
            data: buffer.data,
        }
    }
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Fails fast on zero dimensions or when `data.len() != 4 * width * height`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImprintError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ImprintError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a buffer filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImprintError::InvalidDimensions { width, height });
        }
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::from_rgba(width, height, data)
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImprintError::InvalidDimensions { width, height });
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::from_rgba(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at `(x, y)`. Coordinates must be in range.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Luminance of the pixel at `(x, y)`.
    pub fn luma(&self, x: u32, y: u32) -> f64 {
        let [r, g, b, _] = self.pixel(x, y);
        luminance(r as f64, g as f64, b as f64)
    }

    /// Area-average resample to `width x height`.
    ///
    /// Each destination pixel is the mean of the source rectangle it covers,
    /// so the cost is linear in the source size and needs no scratch buffer
    /// beyond the output. Upsampling degrades to nearest-neighbour.
    pub fn resample(&self, width: u32, height: u32) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(ImprintError::InvalidDimensions { width, height });
        }
        if (width, height) == (self.width, self.height) {
            return Ok(self.clone());
        }

        let mut out = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for ty in 0..height {
            let y0 = span_start(ty, height, self.height);
            let y1 = span_end(ty, height, self.height).max(y0 + 1);
            for tx in 0..width {
                let x0 = span_start(tx, width, self.width);
                let x1 = span_end(tx, width, self.width).max(x0 + 1);

                let mut sums = [0u64; CHANNELS];
                for sy in y0..y1 {
                    let row = sy as usize * self.width as usize;
                    for sx in x0..x1 {
                        let i = (row + sx as usize) * CHANNELS;
                        for (c, sum) in sums.iter_mut().enumerate() {
                            *sum += self.data[i + c] as u64;
                        }
                    }
                }
                let count = ((y1 - y0) as u64) * ((x1 - x0) as u64);
                for sum in sums {
                    out.push(((sum + count / 2) / count) as u8);
                }
            }
        }
        Self::from_rgba(width, height, out)
    }
}

/// ITU-R BT.601 luma weights.
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn span_start(index: u32, target: u32, source: u32) -> u32 {
    ((index as u64 * source as u64) / target as u64) as u32
}

fn span_end(index: u32, target: u32, source: u32) -> u32 {
    (((index as u64 + 1) * source as u64) / target as u64).min(source as u64) as u32
}

#[cfg(feature = "image")]
mod image_impl {
    use image::{DynamicImage, RgbaImage};

    use super::PixelBuffer;
    use crate::error::Result;

    impl PixelBuffer {
        /// Convert a decoded image into an RGBA pixel buffer.
        pub fn from_image(image: &DynamicImage) -> Result<Self> {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self::from_rgba(width, height, rgba.into_raw())
        }

        /// Convert back into an `image` RGBA buffer (for encoding).
        pub fn to_rgba_image(&self) -> RgbaImage {
            // Length is guaranteed by the constructor invariant.
            RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
        }
    }

    impl TryFrom<&DynamicImage> for PixelBuffer {
        type Error = crate::error::ImprintError;

        fn try_from(image: &DynamicImage) -> Result<Self> {
            Self::from_image(image)
        }
    }
}
