#![no_main]

//! Fuzz target for bit sequence parsing and detection
//!
//! Splits the input in two, parses each half as 0/1 bytes and compares
//! them. Lengths differ freely, including empty halves.
//!
//! Run with: cargo +nightly fuzz run fuzz_detect

use invisimark_core::{verify, BitSequence, DEFAULT_THRESHOLD};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let split = data.first().map_or(0, |&b| b as usize).min(data.len());
    let (left, right) = data.split_at(split);

    let (Ok(extracted), Ok(expected)) = (
        BitSequence::from_u8_slice(left),
        BitSequence::from_u8_slice(right),
    ) else {
        return;
    };

    let result = verify(&extracted, &expected, DEFAULT_THRESHOLD);
    assert!((0.0..=1.0).contains(&result.ber));
    assert_eq!(result.compared, extracted.len().min(expected.len()));
    assert_eq!(result.verdict, result.compared > 0 && result.ber < DEFAULT_THRESHOLD);
});
