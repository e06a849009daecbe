//! Compression layer: raw (headerless) deflate.
//!
//! The wire format expects a minimal envelope, so the stream carries no
//! container header, checksum, or length field.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::errors::HcertError;

/// Hard cap on inflated output. Tokens are QR-sized; anything larger is a
/// decompression bomb, not a certificate.
pub const MAX_INFLATED_LEN: usize = 1_048_576; // 1 MiB

/// Raw-deflate `bytes` at the highest compression level (wire tokens are
/// QR-constrained, smallest output wins).
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, HcertError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|e| HcertError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| HcertError::Compression(e.to_string()))
}

/// Raw-inflate `bytes`. A corrupt stream or output above
/// [`MAX_INFLATED_LEN`] fails with [`HcertError::Compression`]; the
/// pipeline aborts, it never retries.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, HcertError> {
    let mut decoder = DeflateDecoder::new(bytes).take(MAX_INFLATED_LEN as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| HcertError::Compression(e.to_string()))?;
    if out.len() > MAX_INFLATED_LEN {
        return Err(HcertError::Compression(
            "inflated output exceeds size cap".to_owned(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"a certificate payload, repeated: a certificate payload";
        let compressed = compress(data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn empty_round_trip() {
        let compressed = compress(b"").unwrap();
        assert_eq!(decompress(&compressed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn output_is_headerless() {
        // A zlib container would open with 0x78; raw deflate of ASCII
        // never does.
        let compressed = compress(b"headerless").unwrap();
        assert_ne!(compressed[0], 0x78);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        // Raw deflate carries no checksum, so truncation mid-block is the
        // reliable corruption: the final block never completes.
        let mut compressed = compress(b"some payload bytes").unwrap();
        compressed.truncate(compressed.len() - 1);
        assert!(matches!(
            decompress(&compressed),
            Err(HcertError::Compression(_))
        ));
    }
}
