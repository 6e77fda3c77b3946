//! Minimal TIFF/Exif IFD reader.
//!
//! Reads IFD0 and, through the Exif pointer, the Exif sub-IFD. Only the tags
//! that identify a producing tool are decoded.

use super::cursor::{ByteCursor, Endian};
use super::{clean_text, FormatSignals};

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_HOST_COMPUTER: u16 = 0x013C;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;

/// Guard against hostile entry counts.
const MAX_ENTRIES: u16 = 512;

const TYPE_ASCII: u16 = 2;

#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field within the TIFF block.
    value_pos: usize,
}

/// Parse a TIFF block (the APP1 body after `Exif\0\0`).
pub(super) fn parse(tiff: &[u8], signals: &mut FormatSignals) {
    if parse_inner(tiff, signals).is_none() {
        signals.truncated = true;
    }
}

fn parse_inner(tiff: &[u8], signals: &mut FormatSignals) -> Option<()> {
    let mut cursor = ByteCursor::new(tiff);
    let endian = match &cursor.read_array::<2>()? {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return None,
    };
    if cursor.read_u16(endian)? != 42 {
        return None;
    }
    let ifd0 = cursor.read_u32(endian)? as usize;

    let mut exif_ifd = None;
    for entry in read_ifd(tiff, ifd0, endian)? {
        match entry.tag {
            TAG_SOFTWARE => signals.software = ascii(tiff, entry, endian),
            TAG_MAKE => signals.make = ascii(tiff, entry, endian),
            TAG_MODEL => signals.model = ascii(tiff, entry, endian),
            TAG_IMAGE_DESCRIPTION | TAG_HOST_COMPUTER => {
                signals.comments.extend(ascii(tiff, entry, endian))
            }
            TAG_EXIF_IFD => exif_ifd = long_value(tiff, entry, endian),
            _ => {}
        }
    }

    // Followed once; the sub-IFD may not point back.
    if let Some(offset) = exif_ifd {
        for entry in read_ifd(tiff, offset as usize, endian)? {
            if entry.tag == TAG_USER_COMMENT {
                signals
                    .comments
                    .extend(user_comment(value_bytes(tiff, entry, endian)?, endian));
            }
        }
    }
    Some(())
}

fn read_ifd(tiff: &[u8], offset: usize, endian: Endian) -> Option<Vec<Entry>> {
    let mut cursor = ByteCursor::at(tiff, offset)?;
    let count = cursor.read_u16(endian)?.min(MAX_ENTRIES);
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = cursor.read_u16(endian)?;
        let kind = cursor.read_u16(endian)?;
        let count = cursor.read_u32(endian)?;
        let value_pos = cursor.position();
        cursor.skip(4)?;
        entries.push(Entry {
            tag,
            kind,
            count,
            value_pos,
        });
    }
    Some(entries)
}

fn type_size(kind: u16) -> usize {
    match kind {
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 => 8,
        _ => 0,
    }
}

/// Raw value bytes, inline when they fit in 4 bytes.
fn value_bytes(tiff: &[u8], entry: Entry, endian: Endian) -> Option<&[u8]> {
    let size = type_size(entry.kind).checked_mul(entry.count as usize)?;
    if size == 0 {
        return None;
    }
    let start = if size <= 4 {
        entry.value_pos
    } else {
        let mut cursor = ByteCursor::at(tiff, entry.value_pos)?;
        cursor.read_u32(endian)? as usize
    };
    tiff.get(start..start.checked_add(size)?)
}

fn ascii(tiff: &[u8], entry: Entry, endian: Endian) -> Option<String> {
    if entry.kind != TYPE_ASCII {
        return None;
    }
    clean_text(value_bytes(tiff, entry, endian)?)
}

fn long_value(tiff: &[u8], entry: Entry, endian: Endian) -> Option<u32> {
    let mut cursor = ByteCursor::at(tiff, entry.value_pos)?;
    cursor.read_u32(endian)
}

/// UserComment: 8-byte character code followed by the text.
fn user_comment(bytes: &[u8], endian: Endian) -> Option<String> {
    let (code, text) = (bytes.get(..8)?, bytes.get(8..)?);
    if code.starts_with(b"UNICODE") {
        let units: Vec<u16> = text
            .chunks_exact(2)
            .map(|c| match endian {
                Endian::Big => u16::from_be_bytes([c[0], c[1]]),
                Endian::Little => u16::from_le_bytes([c[0], c[1]]),
            })
            .collect();
        let decoded = String::from_utf16_lossy(&units);
        clean_text(decoded.as_bytes())
    } else {
        clean_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with the given ASCII tags in IFD0 and an optional
    /// UserComment in the Exif sub-IFD.
    fn build_tiff(tags: &[(u16, &str)], user_comment: Option<&str>) -> Vec<u8> {
        let mut entries: Vec<(u16, u16, u32, [u8; 4])> = Vec::new();
        let mut heap: Vec<u8> = Vec::new();
        let ifd0_len = 2 + 12 * (tags.len() + usize::from(user_comment.is_some())) + 4;
        let heap_base = 8 + ifd0_len;

        for (tag, text) in tags {
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            let value = if bytes.len() <= 4 {
                let mut v = [0u8; 4];
                v[..bytes.len()].copy_from_slice(&bytes);
                v
            } else {
                let off = (heap_base + heap.len()) as u32;
                heap.extend_from_slice(&bytes);
                off.to_le_bytes()
            };
            entries.push((*tag, TYPE_ASCII, bytes.len() as u32, value));
        }

        let mut sub_ifd = Vec::new();
        if let Some(comment) = user_comment {
            let mut text = b"ASCII\0\0\0".to_vec();
            text.extend_from_slice(comment.as_bytes());
            let sub_offset = heap_base + heap.len();
            let text_offset = sub_offset + 2 + 12 + 4;
            sub_ifd.extend_from_slice(&1u16.to_le_bytes());
            sub_ifd.extend_from_slice(&TAG_USER_COMMENT.to_le_bytes());
            sub_ifd.extend_from_slice(&7u16.to_le_bytes());
            sub_ifd.extend_from_slice(&(text.len() as u32).to_le_bytes());
            sub_ifd.extend_from_slice(&(text_offset as u32).to_le_bytes());
            sub_ifd.extend_from_slice(&0u32.to_le_bytes());
            sub_ifd.extend_from_slice(&text);
            entries.push((TAG_EXIF_IFD, 4, 1, (sub_offset as u32).to_le_bytes()));
        }

        let mut out = b"II".to_vec();
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, count, value) in entries {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&value);
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&heap);
        out.extend_from_slice(&sub_ifd);
        out
    }

    #[test]
    fn test_software_make_and_comment() {
        let tiff = build_tiff(
            &[(TAG_MAKE, "Apple"), (TAG_SOFTWARE, "Adobe Photoshop 25.0")],
            Some("retouched"),
        );
        let mut s = FormatSignals::default();
        parse(&tiff, &mut s);
        assert_eq!(s.make.as_deref(), Some("Apple"));
        assert_eq!(s.software.as_deref(), Some("Adobe Photoshop 25.0"));
        assert_eq!(s.comments, vec!["retouched".to_string()]);
        assert!(!s.truncated);
    }

    #[test]
    fn test_inline_short_ascii() {
        let tiff = build_tiff(&[(TAG_MODEL, "X1")], None);
        let mut s = FormatSignals::default();
        parse(&tiff, &mut s);
        assert_eq!(s.model.as_deref(), Some("X1"));
    }

    #[test]
    fn test_big_endian_header() {
        let mut tiff = b"MM".to_vec();
        tiff.extend_from_slice(&42u16.to_be_bytes());
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&TAG_MAKE.to_be_bytes());
        tiff.extend_from_slice(&TYPE_ASCII.to_be_bytes());
        tiff.extend_from_slice(&4u32.to_be_bytes());
        tiff.extend_from_slice(b"Sny\0");
        let mut s = FormatSignals::default();
        parse(&tiff, &mut s);
        assert_eq!(s.make.as_deref(), Some("Sny"));
    }

    #[test]
    fn test_bad_offsets_are_contained() {
        let mut tiff = build_tiff(&[(TAG_SOFTWARE, "Some long software name")], None);
        // Point the value offset far past the end.
        let value_pos = 8 + 2 + 8;
        tiff[value_pos..value_pos + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut s = FormatSignals::default();
        parse(&tiff, &mut s);
        assert_eq!(s.software, None);
    }

    #[test]
    fn test_garbage_header() {
        let mut s = FormatSignals::default();
        parse(b"XX\0\0", &mut s);
        assert!(s.truncated);
    }

    #[test]
    fn test_unicode_user_comment() {
        let mut bytes = b"UNICODE\0".to_vec();
        for u in "hi there".encode_utf16() {
            bytes.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(
            user_comment(&bytes, Endian::Little).as_deref(),
            Some("hi there")
        );
    }
}
