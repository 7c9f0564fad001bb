//! Fuzz target for backend reply classification.
//!
//! Run with: cargo +nightly fuzz run fuzz_classify
//!
//! Any JSON value must classify to exactly one variant without panicking,
//! and rendering its summary must not panic either. An object carrying the
//! extraction marker is always an extraction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rulewatch_core::{ResponseKind, classify};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let has_extraction_key = raw.get("extracted_rules").is_some();

    let response = classify(raw);
    let _ = response.summary();

    // The extraction marker decides the variant regardless of field types.
    if has_extraction_key {
        assert_eq!(response.kind(), ResponseKind::RuleExtraction);
    }
});
