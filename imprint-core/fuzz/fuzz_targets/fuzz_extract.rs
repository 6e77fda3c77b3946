#![no_main]

//! Fuzz target for LSB payload extraction
//!
//! The first two bytes pick the width; the rest become RGBA pixel data.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract

use imprint_core::codec::{extract, Payload};
use imprint_core::PixelBuffer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }
    let width = u32::from(u16::from_le_bytes([data[0], data[1]])).max(1);
    let body = &data[2..];
    let pixels = body.len() / 4;
    let height = pixels as u32 / width;
    if height == 0 {
        return;
    }
    let len = (width * height) as usize * 4;
    if let Ok(buffer) = PixelBuffer::from_rgba(width, height, body[..len].to_vec()) {
        let _ = extract(&buffer);
    }

    // Payload text parsing on the raw bytes too
    if let Ok(text) = std::str::from_utf8(body) {
        let _ = Payload::parse(text);
    }
});
