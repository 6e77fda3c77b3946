//! XMP packet scanning.

use std::sync::OnceLock;

use regex::bytes::Regex;

use super::clean_text;

/// Bytes of an XMP packet searched for the creator tool.
const XMP_SCAN_LIMIT: usize = 64 * 1024;

/// Attribute form `xmp:CreatorTool="..."` or element form
/// `<xmp:CreatorTool>...</xmp:CreatorTool>`, value capped at 200 bytes.
const CREATOR_TOOL_PATTERN: &str =
    r#"xmp:CreatorTool(?:\s*=\s*["']([^"'<>]{1,200})["']|>([^<]{1,200})<)"#;

fn creator_tool_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(CREATOR_TOOL_PATTERN).ok())
        .as_ref()
}

/// Extract `xmp:CreatorTool` from a packet.
pub(super) fn creator_tool(packet: &[u8]) -> Option<String> {
    let window = &packet[..packet.len().min(XMP_SCAN_LIMIT)];
    let caps = creator_tool_regex()?.captures(window)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    clean_text(value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_form() {
        let xmp = br#"<rdf:Description xmp:CreatorTool="Adobe Photoshop 25.1 (Windows)" />"#;
        assert_eq!(
            creator_tool(xmp).as_deref(),
            Some("Adobe Photoshop 25.1 (Windows)")
        );
    }

    #[test]
    fn test_element_form() {
        let xmp = b"<xmp:CreatorTool>Snapseed 2.0</xmp:CreatorTool>";
        assert_eq!(creator_tool(xmp).as_deref(), Some("Snapseed 2.0"));
    }

    #[test]
    fn test_absent_or_unterminated() {
        assert_eq!(creator_tool(b"<rdf:Description/>"), None);
        assert_eq!(creator_tool(b"xmp:CreatorTool=\"never closed"), None);
    }
}
