#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the binary object decoder and the envelope parser
    let _ = hcert_engine::cbor::from_slice(data);
    let _ = hcert_engine::cose::unwrap(data);
});
