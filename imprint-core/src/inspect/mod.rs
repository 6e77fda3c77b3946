//! Container introspection for JPEG and PNG files.
//!
//! Walks JPEG marker segments and PNG chunks to recover encoder and editor
//! metadata plus quantization fingerprints. This reads container structure
//! only; pixel decoding is the caller's business.
//!
//! The walkers never panic and never read out of bounds: a segment or chunk
//! whose declared length runs past the buffer ends the walk, and whatever was
//! collected up to that point is returned.

pub mod cursor;
mod exif;
mod jpeg;
mod png;
mod xmp;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use cursor::{ByteCursor, Endian};

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Container format recognised from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContainerKind {
    Jpeg,
    Png,
    #[default]
    Unknown,
}

impl ContainerKind {
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&PNG_SIGNATURE) {
            Self::Png
        } else if data.starts_with(&JPEG_SOI) {
            Self::Jpeg
        } else {
            Self::Unknown
        }
    }
}

/// Chroma subsampling mode derived from SOF sampling factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaSubsampling {
    #[serde(rename = "4:4:4")]
    Yuv444,
    #[serde(rename = "4:2:2")]
    Yuv422,
    #[serde(rename = "4:2:0")]
    Yuv420,
    #[serde(rename = "4:4:0")]
    Yuv440,
    #[serde(rename = "4:1:1")]
    Yuv411,
    #[serde(rename = "grayscale")]
    Grayscale,
    #[serde(rename = "other")]
    Other,
}

impl ChromaSubsampling {
    /// Classify from the luma and first chroma component sampling factors.
    pub fn from_factors(luma: (u8, u8), chroma: (u8, u8)) -> Self {
        let (ch, cv) = chroma;
        if ch == 0 || cv == 0 || luma.0 % ch != 0 || luma.1 % cv != 0 {
            return Self::Other;
        }
        match (luma.0 / ch, luma.1 / cv) {
            (1, 1) => Self::Yuv444,
            (2, 1) => Self::Yuv422,
            (2, 2) => Self::Yuv420,
            (1, 2) => Self::Yuv440,
            (4, 1) => Self::Yuv411,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yuv444 => "4:4:4",
            Self::Yuv422 => "4:2:2",
            Self::Yuv420 => "4:2:0",
            Self::Yuv440 => "4:4:0",
            Self::Yuv411 => "4:1:1",
            Self::Grayscale => "grayscale",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// One 64-coefficient JPEG quantization table, in file (zigzag) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantTable {
    /// Destination slot (0-3).
    pub id: u8,
    /// 8 or 16.
    pub precision_bits: u8,
    pub values: Vec<u16>,
}

impl QuantTable {
    /// DC quantizer (first coefficient).
    pub fn dc(&self) -> u16 {
        self.values.first().copied().unwrap_or_default()
    }

    /// Mean over all 64 coefficients.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Mean over the 63 AC coefficients.
    pub fn ac_mean(&self) -> f64 {
        let ac = self.values.get(1..).unwrap_or_default();
        if ac.is_empty() {
            return 0.0;
        }
        ac.iter().map(|&v| v as f64).sum::<f64>() / ac.len() as f64
    }
}

/// Physical pixel density from a PNG `pHYs` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelDensity {
    pub x: u32,
    pub y: u32,
    /// 1 = pixels per meter, 0 = aspect ratio only.
    pub unit: u8,
}

impl PixelDensity {
    /// Horizontal density in dots per inch, when the unit is meters.
    pub fn dpi(&self) -> Option<f64> {
        (self.unit == 1).then(|| self.x as f64 * 0.0254)
    }
}

/// Everything the inspector recovers from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSignals {
    pub container: ContainerKind,
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Exif Software (0x0131) or PNG `Software` text.
    pub software: Option<String>,
    /// Exif Make (0x010F).
    pub make: Option<String>,
    /// Exif Model (0x0110).
    pub model: Option<String>,
    /// JPEG COM segments, Exif comment tags and PNG comment text.
    pub comments: Vec<String>,
    pub xmp_creator_tool: Option<String>,

    pub has_icc: bool,
    pub icc_profile: Option<String>,
    /// APP13 "Photoshop 3.0" resource block present.
    pub photoshop_marker: bool,

    pub has_jfif: bool,
    pub jfif_version: Option<(u8, u8)>,
    pub has_exif: bool,
    pub progressive: bool,
    pub subsampling: Option<ChromaSubsampling>,
    pub luma_table: Option<QuantTable>,
    pub chroma_table: Option<QuantTable>,

    /// PNG text chunks as `(keyword, text)`. Compressed text keeps an empty value.
    pub png_text: Vec<(String, String)>,
    pub pixel_density: Option<PixelDensity>,

    /// Number of segments or chunks walked.
    pub segments: usize,
    /// The walk stopped early on truncated or malformed structure.
    pub truncated: bool,
}

impl FormatSignals {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    pub fn long_edge(&self) -> Option<u32> {
        self.dimensions().map(|(w, h)| w.max(h))
    }

    /// ICC profile names that only Adobe tooling writes by default.
    pub fn has_adobe_icc(&self) -> bool {
        self.icc_profile
            .as_deref()
            .is_some_and(|name| name.contains("Adobe") || name.contains("ProPhoto"))
    }

    /// All free text fields, for keyword scanning.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        self.comments
            .iter()
            .map(String::as_str)
            .chain(self.png_text.iter().map(|(_, v)| v.as_str()))
            .chain(self.software.as_deref())
            .chain(self.xmp_creator_tool.as_deref())
    }
}

/// Parse container metadata. Unknown containers yield empty signals.
pub fn inspect(data: &[u8]) -> FormatSignals {
    let mut signals = FormatSignals {
        container: ContainerKind::detect(data),
        ..FormatSignals::default()
    };

    match signals.container {
        ContainerKind::Jpeg => jpeg::walk(data, &mut signals),
        ContainerKind::Png => png::walk(data, &mut signals),
        ContainerKind::Unknown => {}
    }

    debug!(
        container = ?signals.container,
        segments = signals.segments,
        truncated = signals.truncated,
        has_exif = signals.has_exif,
        software = signals.software.as_deref().unwrap_or("-"),
        "Inspected container"
    );
    signals
}

/// Decode text bytes, dropping NUL padding and surrounding whitespace.
pub(crate) fn clean_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_container() {
        assert_eq!(ContainerKind::detect(&PNG_SIGNATURE), ContainerKind::Png);
        assert_eq!(ContainerKind::detect(&[0xFF, 0xD8, 0xFF]), ContainerKind::Jpeg);
        assert_eq!(ContainerKind::detect(b"GIF89a"), ContainerKind::Unknown);
        assert_eq!(ContainerKind::detect(&[]), ContainerKind::Unknown);
    }

    #[test]
    fn test_unknown_yields_empty_signals() {
        let signals = inspect(b"RIFF....WEBPVP8 ");
        assert_eq!(signals, FormatSignals::default());
    }

    #[test]
    fn test_subsampling_from_factors() {
        assert_eq!(
            ChromaSubsampling::from_factors((2, 2), (1, 1)),
            ChromaSubsampling::Yuv420
        );
        assert_eq!(
            ChromaSubsampling::from_factors((2, 1), (1, 1)),
            ChromaSubsampling::Yuv422
        );
        assert_eq!(
            ChromaSubsampling::from_factors((1, 1), (1, 1)),
            ChromaSubsampling::Yuv444
        );
        assert_eq!(
            ChromaSubsampling::from_factors((3, 1), (2, 1)),
            ChromaSubsampling::Other
        );
        assert_eq!(
            ChromaSubsampling::from_factors((1, 1), (0, 1)),
            ChromaSubsampling::Other
        );
    }

    #[test]
    fn test_quant_table_stats() {
        let mut values = vec![2u16; 64];
        values[0] = 10;
        let table = QuantTable {
            id: 0,
            precision_bits: 8,
            values,
        };
        assert_eq!(table.dc(), 10);
        assert_eq!(table.ac_mean(), 2.0);
        assert_eq!(table.mean(), (10.0 + 63.0 * 2.0) / 64.0);
    }

    #[test]
    fn test_density_dpi() {
        let d = PixelDensity {
            x: 5669,
            y: 5669,
            unit: 1,
        };
        assert!((d.dpi().unwrap() - 144.0).abs() < 0.1);
        assert_eq!(PixelDensity { unit: 0, ..d }.dpi(), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(b"  GIMP 2.10\0\0"), Some("GIMP 2.10".to_string()));
        assert_eq!(clean_text(b"\0\0 "), None);
    }
}
