//! JPEG marker segment walker.
//!
//! Walks segments from offset 2 (after SOI) and stops at SOS, EOI, a lost
//! marker sync or any segment whose declared length exceeds the buffer.

use super::cursor::ByteCursor;
use super::{clean_text, exif, xmp, ChromaSubsampling, FormatSignals, QuantTable};

const SOF0: u8 = 0xC0;
const SOF1: u8 = 0xC1;
const SOF2: u8 = 0xC2;
const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const TEM: u8 = 0x01;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const APP13: u8 = 0xED;
const COM: u8 = 0xFE;

const JFIF_ID: &[u8] = b"JFIF\0";
const EXIF_ID: &[u8] = b"Exif\0\0";
const XMP_ID: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const ICC_ID: &[u8] = b"ICC_PROFILE\0";
const PHOTOSHOP_ID: &[u8] = b"Photoshop 3.0\0";

/// Upper bound on segments walked before SOS.
const MAX_SEGMENTS: usize = 1024;

/// Coefficients per quantization table.
const QUANT_TABLE_LEN: usize = 64;

struct Segment<'a> {
    marker: u8,
    body: &'a [u8],
}

pub(super) fn walk(data: &[u8], signals: &mut FormatSignals) {
    let Some(mut cursor) = ByteCursor::at(data, 2) else {
        signals.truncated = true;
        return;
    };

    while signals.segments < MAX_SEGMENTS {
        let Some(segment) = next_segment(&mut cursor) else {
            signals.truncated = true;
            return;
        };
        signals.segments += 1;

        match segment.marker {
            APP0 => parse_app0(segment.body, signals),
            APP1 => parse_app1(segment.body, signals),
            APP2 => parse_app2(segment.body, signals),
            APP13 => {
                if segment.body.starts_with(PHOTOSHOP_ID) {
                    signals.photoshop_marker = true;
                }
            }
            COM => signals.comments.extend(clean_text(segment.body)),
            DQT => parse_dqt(segment.body, signals),
            SOF0 | SOF1 | SOF2 => parse_sof(segment.marker, segment.body, signals),
            SOS | EOI => return,
            _ => {}
        }
    }
}

fn next_segment<'a>(cursor: &mut ByteCursor<'a>) -> Option<Segment<'a>> {
    if cursor.read_u8()? != 0xFF {
        return None;
    }
    let mut marker = cursor.read_u8()?;
    // Fill bytes may precede a marker.
    while marker == 0xFF {
        marker = cursor.read_u8()?;
    }

    if marker == EOI || marker == TEM || (0xD0..=0xD7).contains(&marker) {
        return Some(Segment { marker, body: &[] });
    }

    let length = cursor.read_u16_be()? as usize;
    if length < 2 {
        return None;
    }
    let body = cursor.read_bytes(length - 2)?;
    Some(Segment { marker, body })
}

fn parse_app0(body: &[u8], signals: &mut FormatSignals) {
    if let Some(rest) = body.strip_prefix(JFIF_ID) {
        signals.has_jfif = true;
        if let [major, minor, ..] = rest {
            signals.jfif_version = Some((*major, *minor));
        }
    }
}

fn parse_app1(body: &[u8], signals: &mut FormatSignals) {
    if let Some(tiff) = body.strip_prefix(EXIF_ID) {
        signals.has_exif = true;
        exif::parse(tiff, signals);
    } else if let Some(packet) = body.strip_prefix(XMP_ID) {
        if signals.xmp_creator_tool.is_none() {
            signals.xmp_creator_tool = xmp::creator_tool(packet);
        }
    }
}

fn parse_app2(body: &[u8], signals: &mut FormatSignals) {
    let Some(rest) = body.strip_prefix(ICC_ID) else {
        return;
    };
    signals.has_icc = true;
    // Sequence number and chunk count precede the profile bytes.
    if signals.icc_profile.is_none() {
        signals.icc_profile = icc_profile_name(rest.get(2..).unwrap_or_default());
    }
}

fn parse_dqt(body: &[u8], signals: &mut FormatSignals) {
    let mut cursor = ByteCursor::new(body);
    while !cursor.is_empty() {
        let Some(pq_tq) = cursor.read_u8() else { break };
        let sixteen_bit = pq_tq >> 4 != 0;
        let id = pq_tq & 0x0F;

        let mut values = Vec::with_capacity(QUANT_TABLE_LEN);
        for _ in 0..QUANT_TABLE_LEN {
            let value = if sixteen_bit {
                cursor.read_u16_be()
            } else {
                cursor.read_u8().map(u16::from)
            };
            match value {
                Some(v) => values.push(v),
                None => {
                    signals.truncated = true;
                    return;
                }
            }
        }

        let table = QuantTable {
            id,
            precision_bits: if sixteen_bit { 16 } else { 8 },
            values,
        };
        match id {
            0 => signals.luma_table = Some(table),
            1 => signals.chroma_table = Some(table),
            _ => {}
        }
    }
}

fn parse_sof(marker: u8, body: &[u8], signals: &mut FormatSignals) {
    let mut cursor = ByteCursor::new(body);
    let Some(header) = read_frame_header(&mut cursor) else {
        signals.truncated = true;
        return;
    };
    signals.progressive = marker == SOF2;
    signals.height = Some(header.height as u32);
    signals.width = Some(header.width as u32);

    let mut factors = Vec::with_capacity(header.components as usize);
    for _ in 0..header.components {
        let Some([_id, sampling, _tq]) = cursor.read_array::<3>() else {
            signals.truncated = true;
            return;
        };
        factors.push((sampling >> 4, sampling & 0x0F));
    }

    signals.subsampling = match factors.as_slice() {
        [] => None,
        [_] => Some(ChromaSubsampling::Grayscale),
        [luma, chroma, ..] => Some(ChromaSubsampling::from_factors(*luma, *chroma)),
    };
}

struct FrameHeader {
    height: u16,
    width: u16,
    components: u8,
}

fn read_frame_header(cursor: &mut ByteCursor<'_>) -> Option<FrameHeader> {
    let _precision = cursor.read_u8()?;
    let height = cursor.read_u16_be()?;
    let width = cursor.read_u16_be()?;
    let components = cursor.read_u8()?;
    Some(FrameHeader {
        height,
        width,
        components,
    })
}

/// Known profile names, most specific first.
const ICC_NAMES: &[(&str, &str)] = &[
    ("ProPhoto", "ProPhoto RGB"),
    ("Adobe RGB", "Adobe RGB (1998)"),
    ("Display P3", "Display P3"),
    ("sRGB", "sRGB"),
];

/// Bytes of an ICC profile scanned for a description.
const ICC_SCAN_LIMIT: usize = 64 * 1024;

/// Guess the profile name by scanning for well-known descriptions.
///
/// Version 4 profiles store descriptions as UTF-16, so NUL bytes are dropped
/// before matching.
pub(super) fn icc_profile_name(profile: &[u8]) -> Option<String> {
    let window = &profile[..profile.len().min(ICC_SCAN_LIMIT)];
    let ascii: Vec<u8> = window.iter().copied().filter(|&b| b != 0).collect();
    ICC_NAMES
        .iter()
        .find(|(needle, _)| contains(&ascii, needle.as_bytes()))
        .map(|(_, name)| name.to_string())
}

pub(super) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
