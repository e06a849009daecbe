//! End-to-end pipeline scenarios: sign → pack → unpack → verify.

use hcert_engine::{
    cose, cwt, extract_certificate, inspect, sign_and_pack, unpack, unpack_and_verify,
    CertificatePayload, ClaimSet, Ed25519Signer, Ed25519Verifier, Es256Signer, Es256Verifier,
    HcertError, PersonName, TestEntry, Verification,
};
use p256::ecdsa::{SigningKey, VerifyingKey};
use rand_core::OsRng;

fn test_certificate() -> CertificatePayload {
    CertificatePayload {
        version: "1.0.0".to_owned(),
        name: PersonName {
            family_name: Some("d'Arsøns - van Halen".to_owned()),
            family_name_std: "DARSONS<VAN<HALEN".to_owned(),
            given_name: Some("François-Joan".to_owned()),
            given_name_std: Some("FRANCOIS<JOAN".to_owned()),
        },
        date_of_birth: "2009-02-28".to_owned(),
        vaccinations: Vec::new(),
        tests: vec![TestEntry {
            disease: "840539006".to_owned(),
            test_type: "LP217198-3".to_owned(),
            test_name: None,
            device: Some("1232".to_owned()),
            result: "260415000".to_owned(),
            sample_collected: "2021-04-13T14:20:00+00:00".to_owned(),
            result_date: Some("2021-04-13T14:40:01+00:00".to_owned()),
            testing_centre: Some("GGD Fryslân, L-Heliconweg".to_owned()),
            country: "NL".to_owned(),
            issuer: "Ministry of VWS".to_owned(),
            certificate_id: "urn:uvci:01:NL:GGD/81AAH16AZ".to_owned(),
        }],
        recoveries: Vec::new(),
    }
}

fn test_claims() -> ClaimSet {
    ClaimSet {
        issuer: Some("NL".to_owned()),
        issued_at: Some(1_620_312_816),
        expires_at: Some(1_683_345_600),
        certificate: test_certificate(),
    }
}

fn es256_pair() -> (Es256Signer, Es256Verifier) {
    let key = SigningKey::random(&mut OsRng);
    let verifier = Es256Verifier::new(VerifyingKey::from(&key));
    (Es256Signer::new(key), verifier)
}

#[test]
fn sign_pack_unpack_verify_reproduces_the_certificate() {
    let (signer, verifier) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    assert!(token.starts_with("HC1:"));

    let outcome = unpack_and_verify(&token, &verifier).unwrap();
    let payload = outcome.into_payload().expect("signature must verify");
    let claims = ClaimSet::from_bytes(&payload).unwrap();
    assert_eq!(claims, test_claims());
    assert_eq!(claims.certificate, test_certificate());
}

#[test]
fn verification_failure_is_a_value_not_an_error() {
    let (signer, _) = es256_pair();
    let (_, foreign_verifier) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    let outcome = unpack_and_verify(&token, &foreign_verifier).unwrap();
    assert_eq!(outcome, Verification::Rejected);
}

#[test]
fn tampered_signature_is_rejected() {
    let (signer, verifier) = es256_pair();
    let mut envelope = cose::wrap(&test_claims().to_bytes(), &signer, None).unwrap();
    // The signature byte string trails the envelope.
    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;
    let token = hcert_engine::pack(&envelope).unwrap();
    assert_eq!(
        unpack_and_verify(&token, &verifier).unwrap(),
        Verification::Rejected
    );
}

#[test]
fn unpack_requires_no_key_and_extraction_matches() {
    let (signer, _) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();

    let envelope = unpack(&token).unwrap();
    let decoded = cose::unwrap(&envelope).unwrap();
    let certificate = extract_certificate(&decoded.payload).unwrap();
    assert_eq!(certificate, test_certificate());
}

#[test]
fn inspect_surfaces_all_layers_despite_a_bad_signature() {
    let (signer, verifier) = es256_pair();
    let mut envelope = cose::wrap(&test_claims().to_bytes(), &signer, None).unwrap();
    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;
    let token = hcert_engine::pack(&envelope).unwrap();

    let trace = inspect(&token).unwrap();
    assert_eq!(trace.envelope, envelope);
    assert_eq!(trace.signature.len(), 64);
    assert_eq!(
        trace.protected.map_get(cose::HEADER_ALG).and_then(hcert_engine::Value::as_integer),
        Some(-7)
    );

    // The unverified payload parses to the same certificate a valid
    // token would verify to.
    assert_eq!(
        extract_certificate(&trace.payload).unwrap(),
        test_certificate()
    );
    assert_eq!(
        unpack_and_verify(&token, &verifier).unwrap(),
        Verification::Rejected
    );
}

#[test]
fn truncated_token_never_silently_succeeds() {
    let (signer, _) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    let truncated = &token[..token.len() - 1];
    assert!(unpack(truncated).is_err());
}

#[test]
fn prefix_is_case_insensitive_on_decode() {
    let (signer, verifier) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    let lowered = format!("hc1:{}", &token[4..]);
    assert!(unpack_and_verify(&lowered, &verifier).unwrap().is_verified());
}

#[test]
fn missing_prefix_is_a_format_error() {
    let (signer, _) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    assert!(matches!(
        unpack(&token[4..]),
        Err(HcertError::Format(_))
    ));
}

#[test]
fn key_id_survives_the_round_trip() {
    let (signer, _) = es256_pair();
    let token = sign_and_pack(&test_claims(), &signer, Some(b"dsc-fryslan-01")).unwrap();
    let envelope = unpack(&token).unwrap();
    let decoded = cose::unwrap(&envelope).unwrap();
    assert_eq!(decoded.key_id.as_deref(), Some(&b"dsc-fryslan-01"[..]));
}

#[test]
fn ed25519_tokens_round_trip() {
    let key = ed25519_dalek::SigningKey::generate(&mut OsRng);
    let verifier = Ed25519Verifier::new(key.verifying_key());
    let signer = Ed25519Signer::new(key);

    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    let payload = unpack_and_verify(&token, &verifier)
        .unwrap()
        .into_payload()
        .expect("signature must verify");
    assert_eq!(
        cwt::extract_certificate(&payload).unwrap(),
        test_certificate()
    );
}

#[test]
fn algorithm_capability_mismatch_is_rejected() {
    let (signer, _) = es256_pair();
    let ed = ed25519_dalek::SigningKey::generate(&mut OsRng);
    let ed_verifier = Ed25519Verifier::new(ed.verifying_key());
    let token = sign_and_pack(&test_claims(), &signer, None).unwrap();
    assert_eq!(
        unpack_and_verify(&token, &ed_verifier).unwrap(),
        Verification::Rejected
    );
}

#[test]
fn noise_in_the_token_body_errors_cleanly() {
    for bad in ["HC1:%%%%", "HC1:0", "HC1:ABCD3", "HC1:ZZZZZZ"] {
        assert!(unpack(bad).is_err());
    }
}
