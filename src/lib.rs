#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]

//! Hcert Engine — codec and signature envelope for health certificate
//! wire tokens.
//!
//! A token is `"HC1:" + Base45(RawDeflate(CBOR(COSE_Sign1)))` carrying an
//! integer-keyed claim set whose domain claim nests a certificate payload
//! (identity plus one medical event array). This crate implements the
//! byte-exact layer chain and the verification step that is the system's
//! trust boundary.
//!
//! Layers, leaf to root:
//!
//! - [`base45`]: alphabet-restricted text codec (RFC 9285)
//! - [`deflate`]: raw deflate compression
//! - [`cbor`]: compact binary object codec with byte-range access
//! - [`cose`]: detached-signature envelope and algorithm dispatch
//! - [`cwt`]: claim set and certificate payload mapping
//! - [`pipeline`]: the public pack/unpack/sign/verify/inspect operations
//!
//! Everything is purely functional over immutable inputs; calls may run
//! concurrently without coordination. Signature mismatch is an expected
//! outcome ([`Verification::Rejected`]), distinct from structural errors
//! ([`HcertError`]).

pub mod base45;
pub mod cbor;
pub mod cose;
pub mod cwt;
pub mod deflate;
pub mod errors;
pub mod pipeline;

pub use cbor::Value;
pub use cose::{
    Algorithm, DecodedEnvelope, Ed25519Signer, Ed25519Verifier, EnvelopeSigner, EnvelopeVerifier,
    Es256Signer, Es256Verifier, Verification,
};
pub use cwt::{
    extract_certificate, CertificatePayload, ClaimSet, PersonName, RecoveryEntry, TestEntry,
    VaccinationEntry,
};
pub use errors::HcertError;
pub use pipeline::{
    inspect, pack, sign_and_pack, unpack, unpack_and_verify, LayerTrace, TOKEN_PREFIX,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
