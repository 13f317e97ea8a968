#![no_main]

//! Fuzz target for WatermarkDescriptor::from_bytes()
//!
//! Descriptor files are read from disk next to untrusted images, so
//! parsing must reject garbage (CBOR or JSON) without panicking.
//!
//! Run with: cargo +nightly fuzz run fuzz_descriptor

use invisimark_core::{WatermarkCodec, WatermarkDescriptor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(descriptor) = WatermarkDescriptor::from_bytes(data) {
        // A parsed descriptor may still carry nonsense parameters
        if let Ok(codec) = WatermarkCodec::from_descriptor(&descriptor) {
            let _ = codec.params().capacity();
        }
    }
});
