#![no_main]

//! Fuzz target for inspect() and attribute()
//!
//! Any byte string must yield signals and an attribution without panicking,
//! including truncated segments and lengths that point past the end.
//!
//! Run with: cargo +nightly fuzz run fuzz_inspect

use imprint_core::attribution::attribute;
use imprint_core::inspect::inspect;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let signals = inspect(data);
    let _ = attribute(&signals);
});
