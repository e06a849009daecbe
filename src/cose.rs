//! Detached-signature envelope (COSE_Sign1).
//!
//! An envelope is the 4-tuple `(protected, unprotected, payload,
//! signature)` under CBOR tag 18. The protected header travels as an
//! opaque byte string so it contributes unmodified to the signature
//! input; verification rebuilds that input solely from the received
//! `protected` and `payload` byte ranges, never from re-serialized parsed
//! values.
//!
//! Signing and verification are capabilities supplied by the caller as
//! trait objects owning already-parsed key material; key parsing itself
//! lives outside this crate.

use crate::cbor::{self, Value};
use crate::errors::HcertError;

/// CBOR tag wrapping a signed envelope on the wire.
pub const COSE_SIGN1_TAG: u64 = 18;
/// Header label carrying the algorithm identifier.
pub const HEADER_ALG: i64 = 1;
/// Header label carrying the key identifier.
pub const HEADER_KID: i64 = 4;
/// Context string anchoring the signature input structure.
pub const SIG_CONTEXT: &str = "Signature1";

/// Signature algorithms: a closed set dispatched on the identifier
/// recovered from the protected header. Adding an algorithm means adding
/// a variant and its capability adapters; the envelope construction logic
/// is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// ECDSA over P-256 with SHA-256 (identifier -7).
    Es256,
    /// Ed25519 (identifier -8).
    EdDsa,
}

impl Algorithm {
    /// The identifier carried in the protected header.
    #[must_use]
    pub const fn identifier(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::EdDsa => -8,
        }
    }

    /// Raw signature length for the curve in use: concatenated R and S
    /// for a 256-bit curve, not DER.
    #[must_use]
    pub const fn signature_len(self) -> usize {
        64
    }

    /// Dispatch on a recovered identifier. Identifiers outside the
    /// implemented set (RSA-PSS among them) fail with
    /// [`HcertError::UnsupportedAlgorithm`].
    pub fn from_identifier(id: i64) -> Result<Self, HcertError> {
        match id {
            -7 => Ok(Self::Es256),
            -8 => Ok(Self::EdDsa),
            other => Err(HcertError::UnsupportedAlgorithm(other)),
        }
    }
}

/// Outcome of a cryptographic check. A token whose signature does not
/// check out is an expected real-world result (revoked keys, tampered QR
/// codes), not a fault, so it is a value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The signature checks out; the payload bytes are released.
    Verified(Vec<u8>),
    /// Structurally sound envelope whose signature does not verify under
    /// the supplied key.
    Rejected,
}

impl Verification {
    /// The verified payload, or `None` when rejected.
    #[must_use]
    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            Self::Verified(payload) => Some(payload),
            Self::Rejected => None,
        }
    }

    /// Whether the signature checked out.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

// ——— Capabilities ———————————————————————————————————————————————————

/// Signing capability bound to a private key held by the caller.
pub trait EnvelopeSigner {
    /// The algorithm this capability signs with.
    fn algorithm(&self) -> Algorithm;
    /// Produce a raw signature of `algorithm().signature_len()` bytes
    /// over `message`.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HcertError>;
}

/// Verification capability bound to a public key.
pub trait EnvelopeVerifier {
    /// The algorithm this capability verifies.
    fn algorithm(&self) -> Algorithm;
    /// Check `signature` over `message`. A malformed signature is a plain
    /// `false`, never a panic.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// ES256 signer over a P-256 private key.
pub struct Es256Signer {
    key: p256::ecdsa::SigningKey,
}

impl Es256Signer {
    /// Wrap an already-parsed signing key.
    #[must_use]
    pub fn new(key: p256::ecdsa::SigningKey) -> Self {
        Self { key }
    }
}

impl EnvelopeSigner for Es256Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Es256
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HcertError> {
        use p256::ecdsa::signature::Signer;
        let signature: p256::ecdsa::Signature =
            self.key.try_sign(message).map_err(|_| HcertError::Signing)?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// ES256 verifier over a P-256 public key.
pub struct Es256Verifier {
    key: p256::ecdsa::VerifyingKey,
}

impl Es256Verifier {
    /// Wrap an already-parsed verifying key.
    #[must_use]
    pub fn new(key: p256::ecdsa::VerifyingKey) -> Self {
        Self { key }
    }

    /// Build from a SEC1-encoded public point.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, HcertError> {
        p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| HcertError::InvalidKey("sec1 public point"))
    }
}

impl EnvelopeVerifier for Es256Verifier {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Es256
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        use p256::ecdsa::signature::Verifier;
        let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
            return false;
        };
        self.key.verify(message, &signature).is_ok()
    }
}

/// EdDSA signer over an Ed25519 private key.
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Wrap an already-parsed signing key.
    #[must_use]
    pub fn new(key: ed25519_dalek::SigningKey) -> Self {
        Self { key }
    }
}

impl EnvelopeSigner for Ed25519Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDsa
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HcertError> {
        use ed25519_dalek::Signer;
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// EdDSA verifier over an Ed25519 public key.
pub struct Ed25519Verifier {
    key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Verifier {
    /// Wrap an already-parsed verifying key.
    #[must_use]
    pub fn new(key: ed25519_dalek::VerifyingKey) -> Self {
        Self { key }
    }

    /// Build from the raw 32-byte public key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, HcertError> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| HcertError::InvalidKey("ed25519 public key"))
    }
}

impl EnvelopeVerifier for Ed25519Verifier {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDsa
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        self.key.verify_strict(message, &signature).is_ok()
    }
}

// ——— Envelope operations ————————————————————————————————————————————

/// A decoded envelope. `protected` and `payload` hold the byte ranges as
/// received; [`verify`] rebuilds the signature input from these, never
/// from `protected_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Protected header bytes (the byte-string contents, verbatim).
    pub protected: Vec<u8>,
    /// Protected header decoded to a map value, for inspection.
    pub protected_value: Value,
    /// Unprotected header map. Not covered by the signature.
    pub unprotected: Value,
    /// Payload bytes, as carried.
    pub payload: Vec<u8>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// Algorithm identifier from the protected header, when present and
    /// an integer. Left raw so structurally sound envelopes with exotic
    /// algorithms still decode.
    pub algorithm_id: Option<i64>,
    /// Key identifier from either header, the protected one winning.
    pub key_id: Option<Vec<u8>>,
}

/// Build a signed envelope around `payload`.
///
/// The protected header carries the capability's algorithm identifier;
/// `key_id`, when supplied, goes to the unprotected header. The signature
/// input is built from the protected header bytes exactly as they will
/// appear in the tuple.
pub fn wrap(
    payload: &[u8],
    signer: &impl EnvelopeSigner,
    key_id: Option<&[u8]>,
) -> Result<Vec<u8>, HcertError> {
    let algorithm = signer.algorithm();
    let protected = cbor::to_vec(&Value::Map(vec![(
        Value::Integer(HEADER_ALG),
        Value::Integer(algorithm.identifier()),
    )]));

    let signature = signer.sign(&signature_input(&protected, payload))?;
    if signature.len() != algorithm.signature_len() {
        return Err(HcertError::SignatureLength {
            expected: algorithm.signature_len(),
            got: signature.len(),
        });
    }

    let mut unprotected = Vec::new();
    if let Some(kid) = key_id {
        unprotected.push((Value::Integer(HEADER_KID), Value::Bytes(kid.to_vec())));
    }

    let envelope = Value::Tag(
        COSE_SIGN1_TAG,
        Box::new(Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(unprotected),
            Value::Bytes(payload.to_vec()),
            Value::Bytes(signature),
        ])),
    );
    Ok(cbor::to_vec(&envelope))
}

/// Decode an envelope without any cryptographic check.
///
/// Accepts tagged and untagged envelopes (both occur on the wire).
/// Structural malformation (wrong tuple arity, non-byte-string payload
/// or protected header, non-map headers) is an error; nothing about the
/// signature is judged here.
pub fn unwrap(envelope_bytes: &[u8]) -> Result<DecodedEnvelope, HcertError> {
    let value = cbor::from_slice(envelope_bytes)?;
    let value = match value {
        Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
        Value::Tag(..) => return Err(HcertError::Format("unexpected tag on signature envelope")),
        other => other,
    };
    let Value::Array(elements) = value else {
        return Err(HcertError::Format("signature envelope must be an array"));
    };
    let Ok([protected, unprotected, payload, signature]) = <[Value; 4]>::try_from(elements) else {
        return Err(HcertError::Format("signature envelope must have four elements"));
    };

    let Value::Bytes(protected) = protected else {
        return Err(HcertError::Format("protected header must be a byte string"));
    };
    let Value::Bytes(payload) = payload else {
        return Err(HcertError::Format("payload must be a byte string"));
    };
    let Value::Bytes(signature) = signature else {
        return Err(HcertError::Format("signature must be a byte string"));
    };
    if !matches!(unprotected, Value::Map(_)) {
        return Err(HcertError::Format("unprotected header must be a map"));
    }

    // An empty protected byte string stands for the empty map.
    let protected_value = if protected.is_empty() {
        Value::Map(Vec::new())
    } else {
        cbor::from_slice(&protected)?
    };
    if !matches!(protected_value, Value::Map(_)) {
        return Err(HcertError::Format("protected header must encode a map"));
    }

    let algorithm_id = protected_value.map_get(HEADER_ALG).and_then(Value::as_integer);
    let key_id = protected_value
        .map_get(HEADER_KID)
        .or_else(|| unprotected.map_get(HEADER_KID))
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec);

    Ok(DecodedEnvelope {
        protected,
        protected_value,
        unprotected,
        payload,
        signature,
        algorithm_id,
        key_id,
    })
}

/// Decode and cryptographically check an envelope.
///
/// Returns [`Verification::Verified`] with the payload bytes when the
/// signature checks out, [`Verification::Rejected`] when it does not
/// (including an algorithm/capability mismatch), and an error only for
/// structural malformation or an algorithm outside the implemented set.
pub fn verify(
    envelope_bytes: &[u8],
    verifier: &impl EnvelopeVerifier,
) -> Result<Verification, HcertError> {
    let envelope = unwrap(envelope_bytes)?;
    let Some(id) = envelope.algorithm_id else {
        return Err(HcertError::Format("protected header missing algorithm identifier"));
    };
    let algorithm = Algorithm::from_identifier(id)?;
    if algorithm != verifier.algorithm() {
        return Ok(Verification::Rejected);
    }
    if envelope.signature.len() != algorithm.signature_len() {
        return Ok(Verification::Rejected);
    }

    let message = signature_input(&envelope.protected, &envelope.payload);
    if verifier.verify(&message, &envelope.signature) {
        Ok(Verification::Verified(envelope.payload))
    } else {
        Ok(Verification::Rejected)
    }
}

/// The exact byte sequence covered by the signature: the encoded
/// `["Signature1", protected, external_aad = b"", payload]` structure.
fn signature_input(protected: &[u8], payload: &[u8]) -> Vec<u8> {
    cbor::to_vec(&Value::Array(vec![
        Value::Text(SIG_CONTEXT.to_owned()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]))
}
