//! Fuzz target for engine configuration parsing.
//!
//! JSON config parsing and validation must handle arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rt_core::config::RtConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<RtConfig>(data) {
        let _ = config.validate();
    }
});
