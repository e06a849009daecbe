//! Pipeline orchestrator: the public token operations.
//!
//! Encode flows claim set → envelope → deflate → Base45; decode runs the
//! same chain upward. Stages are strictly sequential within a call and a
//! failed stage aborts the rest; nothing is retried. Decoding without
//! verification (`unpack`, `inspect`) and verifying (`unpack_and_verify`)
//! are distinct operations; there is no call shape that silently skips
//! the cryptographic check.

use crate::base45;
use crate::cbor::Value;
use crate::cose::{self, EnvelopeSigner, EnvelopeVerifier, Verification};
use crate::cwt::ClaimSet;
use crate::deflate;
use crate::errors::HcertError;

/// Fixed wire prefix: emitted in this casing, accepted case-insensitively.
pub const TOKEN_PREFIX: &str = "HC1:";

/// Compress and text-encode a signed envelope into a wire token.
pub fn pack(envelope_bytes: &[u8]) -> Result<String, HcertError> {
    let compressed = deflate::compress(envelope_bytes)?;
    Ok(format!("{TOKEN_PREFIX}{}", base45::encode(&compressed)))
}

/// Build the claim-set payload, sign it into an envelope, and pack it.
pub fn sign_and_pack(
    claims: &ClaimSet,
    signer: &impl EnvelopeSigner,
    key_id: Option<&[u8]>,
) -> Result<String, HcertError> {
    let envelope = cose::wrap(&claims.to_bytes(), signer, key_id)?;
    pack(&envelope)
}

/// Strip the prefix, text-decode, and inflate. No key material, no
/// cryptography: the result is envelope bytes whose authenticity is
/// unknown.
pub fn unpack(token: &str) -> Result<Vec<u8>, HcertError> {
    let body = strip_prefix(token)?;
    let compressed = base45::decode(body)?;
    deflate::decompress(&compressed)
}

/// `unpack`, then check the signature under `verifier`. The capability is
/// a required parameter; "decode without verifying" is only expressible
/// through [`unpack`].
pub fn unpack_and_verify(
    token: &str,
    verifier: &impl EnvelopeVerifier,
) -> Result<Verification, HcertError> {
    let envelope = unpack(token)?;
    cose::verify(&envelope, verifier)
}

/// Every intermediate layer of a decoded token, for inspection tooling.
/// Carries no trust decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTrace {
    /// Base45-decoded body: the compressed envelope.
    pub compressed: Vec<u8>,
    /// Inflated envelope bytes.
    pub envelope: Vec<u8>,
    /// Decoded protected header map.
    pub protected: Value,
    /// Unprotected header map.
    pub unprotected: Value,
    /// Claim-set payload bytes, as carried.
    pub payload: Vec<u8>,
    /// Raw signature bytes, not checked.
    pub signature: Vec<u8>,
}

/// Decode every layer of a token without judging the signature. Fails
/// only on structural malformation at some layer; a cryptographically
/// invalid signature still yields the full trace.
pub fn inspect(token: &str) -> Result<LayerTrace, HcertError> {
    let body = strip_prefix(token)?;
    let compressed = base45::decode(body)?;
    let envelope = deflate::decompress(&compressed)?;
    let decoded = cose::unwrap(&envelope)?;
    Ok(LayerTrace {
        compressed,
        envelope,
        protected: decoded.protected_value,
        unprotected: decoded.unprotected,
        payload: decoded.payload,
        signature: decoded.signature,
    })
}

fn strip_prefix(token: &str) -> Result<&str, HcertError> {
    let prefix_len = TOKEN_PREFIX.len();
    if token.len() < prefix_len
        || !token.as_bytes()[..prefix_len].eq_ignore_ascii_case(TOKEN_PREFIX.as_bytes())
    {
        return Err(HcertError::Format("missing wire token prefix"));
    }
    // The matched prefix is ASCII, so the byte index is a char boundary.
    Ok(&token[prefix_len..])
}
