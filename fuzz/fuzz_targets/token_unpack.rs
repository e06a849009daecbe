#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the full text-to-envelope decode path with arbitrary input
    if let Ok(text) = core::str::from_utf8(data) {
        let _ = hcert_engine::unpack(text);
        let _ = hcert_engine::inspect(text);
    }
});
