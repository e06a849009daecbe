use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hcert_engine::{
    base45, cbor, sign_and_pack, unpack_and_verify, CertificatePayload, ClaimSet, Es256Signer,
    Es256Verifier, PersonName, VaccinationEntry,
};
use p256::ecdsa::{SigningKey, VerifyingKey};
use rand_core::OsRng;

fn bench_claims() -> ClaimSet {
    ClaimSet {
        issuer: Some("CH".to_owned()),
        issued_at: Some(1_620_312_816),
        expires_at: Some(1_683_345_600),
        certificate: CertificatePayload {
            version: "1.2.1".to_owned(),
            name: PersonName {
                family_name: Some("Mustermann".to_owned()),
                family_name_std: "MUSTERMANN".to_owned(),
                given_name: Some("Max".to_owned()),
                given_name_std: Some("MAX".to_owned()),
            },
            date_of_birth: "1979-02-15".to_owned(),
            vaccinations: vec![VaccinationEntry {
                disease: "840539006".to_owned(),
                prophylaxis: "1119349007".to_owned(),
                product: "EU/1/20/1507".to_owned(),
                manufacturer: "ORG-100031184".to_owned(),
                dose_number: 1,
                series_doses: 2,
                date: "2021-06-08".to_owned(),
                country: "CH".to_owned(),
                issuer: "Bundesamt für Gesundheit (BAG)".to_owned(),
                certificate_id: "urn:uvci:01:CH:71ECAC66C4473814B3D05CDE".to_owned(),
            }],
            tests: Vec::new(),
            recoveries: Vec::new(),
        },
    }
}

fn bench_base45(c: &mut Criterion) {
    let data: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
    let encoded = base45::encode(&data);

    c.bench_function("base45_encode_1k", |b| {
        b.iter(|| base45::encode(black_box(&data)));
    });
    c.bench_function("base45_decode_1k", |b| {
        b.iter(|| base45::decode(black_box(&encoded)));
    });
}

fn bench_cbor(c: &mut Criterion) {
    let claims = bench_claims();
    let bytes = claims.to_bytes();

    c.bench_function("claims_encode", |b| {
        b.iter(|| black_box(&claims).to_bytes());
    });
    c.bench_function("claims_decode", |b| {
        b.iter(|| cbor::from_slice(black_box(&bytes)));
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let claims = bench_claims();
    let key = SigningKey::random(&mut OsRng);
    let verifier = Es256Verifier::new(VerifyingKey::from(&key));
    let signer = Es256Signer::new(key);
    let token = sign_and_pack(&claims, &signer, None).unwrap();

    c.bench_function("sign_and_pack", |b| {
        b.iter(|| sign_and_pack(black_box(&claims), &signer, None));
    });
    c.bench_function("unpack_and_verify", |b| {
        b.iter(|| unpack_and_verify(black_box(&token), &verifier));
    });
}

criterion_group!(benches, bench_base45, bench_cbor, bench_pipeline);
criterion_main!(benches);
