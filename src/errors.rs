use thiserror::Error;

/// Stage faults surfaced by the token pipeline.
///
/// A signature that does not check out is deliberately NOT represented
/// here; that outcome is carried by [`crate::cose::Verification`]. An
/// `HcertError` always means the input (or a capability) is broken.
#[derive(Debug, Error)]
pub enum HcertError {
    /// Text- or tuple-level structural violation: prefix, alphabet,
    /// grouping, envelope shape, claim layout.
    #[error("format error: {0}")]
    Format(&'static str),

    /// Corrupt or oversized deflate stream.
    #[error("compression error: {0}")]
    Compression(String),

    /// Malformed binary object. `offset` is the byte position at which
    /// decoding failed.
    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: &'static str },

    /// Algorithm identifier carried by the envelope but not implemented
    /// by this build.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    /// Key material rejected by the backing cryptographic implementation.
    #[error("invalid key material: {0}")]
    InvalidKey(&'static str),

    /// The signing capability refused the message.
    #[error("signing capability failed")]
    Signing,

    /// The signing capability produced a signature of the wrong length
    /// for its algorithm.
    #[error("invalid signature length: expected {expected} got {got}")]
    SignatureLength { expected: usize, got: usize },
}
