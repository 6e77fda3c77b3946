//! PNG chunk walker.

use super::cursor::ByteCursor;
use super::{clean_text, xmp, FormatSignals, PixelDensity};

/// Chunks walked before giving up on a file.
const MAX_CHUNKS: usize = 10_000;

const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

pub(super) fn walk(data: &[u8], signals: &mut FormatSignals) {
    let Some(mut cursor) = ByteCursor::at(data, 8) else {
        signals.truncated = true;
        return;
    };

    while !cursor.is_empty() {
        if signals.segments >= MAX_CHUNKS {
            signals.truncated = true;
            return;
        }
        let Some((kind, body)) = next_chunk(&mut cursor) else {
            signals.truncated = true;
            return;
        };
        signals.segments += 1;

        match &kind {
            b"IHDR" => read_ihdr(body, signals),
            b"tEXt" => read_text(body, signals),
            b"iTXt" => read_itxt(body, signals),
            b"zTXt" => read_ztxt(body, signals),
            b"iCCP" => read_iccp(body, signals),
            b"pHYs" => read_phys(body, signals),
            b"IEND" => return,
            _ => {}
        }
    }
}

/// Chunk type and body; the CRC is skipped without verification.
fn next_chunk<'a>(cursor: &mut ByteCursor<'a>) -> Option<([u8; 4], &'a [u8])> {
    let length = cursor.read_u32_be()? as usize;
    let kind = cursor.read_array::<4>()?;
    let body = cursor.read_bytes(length)?;
    cursor.skip(4)?;
    Some((kind, body))
}

fn read_ihdr(body: &[u8], signals: &mut FormatSignals) {
    let mut c = ByteCursor::new(body);
    if let (Some(w), Some(h)) = (c.read_u32_be(), c.read_u32_be()) {
        signals.width = Some(w);
        signals.height = Some(h);
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Route a decoded text entry into the signals.
fn record_text(keyword: String, text: String, signals: &mut FormatSignals) {
    match keyword.as_str() {
        "Software" => signals.software = clean_text(text.as_bytes()),
        "Comment" | "Description" | "Title" | "Author" => {
            signals.comments.extend(clean_text(text.as_bytes()))
        }
        XMP_KEYWORD => {
            if let Some(tool) = xmp::creator_tool(text.as_bytes()) {
                signals.xmp_creator_tool = Some(tool);
            }
        }
        _ => {}
    }
    signals.png_text.push((keyword, text));
}

fn read_text(body: &[u8], signals: &mut FormatSignals) {
    let mut c = ByteCursor::new(body);
    let Some(keyword) = c.read_until_nul() else {
        return;
    };
    let text = latin1(c.rest());
    record_text(latin1(keyword), text, signals);
}

fn read_itxt(body: &[u8], signals: &mut FormatSignals) {
    let mut c = ByteCursor::new(body);
    let Some(keyword) = c.read_until_nul().map(latin1) else {
        return;
    };
    let (Some(compressed), Some(_method)) = (c.read_u8(), c.read_u8()) else {
        return;
    };
    if c.read_until_nul().is_none() || c.read_until_nul().is_none() {
        return;
    }
    let text = if compressed == 0 {
        String::from_utf8_lossy(c.rest()).into_owned()
    } else {
        String::new()
    };
    record_text(keyword, text, signals);
}

fn read_ztxt(body: &[u8], signals: &mut FormatSignals) {
    let mut c = ByteCursor::new(body);
    if let Some(keyword) = c.read_until_nul() {
        signals.png_text.push((latin1(keyword), String::new()));
    }
}

fn read_iccp(body: &[u8], signals: &mut FormatSignals) {
    signals.has_icc = true;
    let mut c = ByteCursor::new(body);
    if let Some(name) = c.read_until_nul() {
        signals.icc_profile = clean_text(&latin1(name).into_bytes());
    }
}

fn read_phys(body: &[u8], signals: &mut FormatSignals) {
    let mut c = ByteCursor::new(body);
    if let (Some(x), Some(y), Some(unit)) = (c.read_u32_be(), c.read_u32_be(), c.read_u8()) {
        signals.pixel_density = Some(PixelDensity { x, y, unit });
    }
}
