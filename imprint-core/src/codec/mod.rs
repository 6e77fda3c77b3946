//! Identity payload embedding in pixel data.
//!
//! # Components
//!
//! - **Payload**: the `IMGCRYPT|subject|gps|timestamp|END` record and its
//!   bit expansion.
//! - **LSB codec**: redundant least-significant-bit embedding with a
//!   byte-aligned window scan for recovery.

pub mod lsb;
pub mod payload;

pub use lsb::{embed, extract, Extraction, ExtractionConfidence, LsbCodec};
pub use payload::{GpsPoint, Payload, MAGIC, NO_GPS, TERMINATOR};
