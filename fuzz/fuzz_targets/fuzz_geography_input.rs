//! Fuzz target for geography input bundle parsing.
//!
//! Arbitrary observation bundles must parse (or fail) cleanly and never
//! panic in structural validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rt_core::series::GeographyInput;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = serde_json::from_slice::<GeographyInput>(data) {
        let _ = input.validate();
    }
});
