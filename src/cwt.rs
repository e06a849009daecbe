//! Claim set mapper.
//!
//! The envelope payload is an integer-keyed claim map: standard claims
//! (issuer, issued-at, expiry) plus one domain claim under a fixed
//! negative key whose value nests the certificate payload under a fixed
//! positive key. The certificate payload itself is the human-meaningful
//! record: schema version, structured name, date of birth, and one array
//! of medical events.
//!
//! Nothing here touches cryptography; extraction is equally valid on a
//! merely-decompressed envelope (diagnostic paths) and on a
//! signature-verified one.

use crate::cbor::{self, Value};
use crate::errors::HcertError;

/// Issuer claim key.
pub const CLAIM_ISSUER: i64 = 1;
/// Expiration-time claim key.
pub const CLAIM_EXPIRES_AT: i64 = 4;
/// Issued-at claim key.
pub const CLAIM_ISSUED_AT: i64 = 6;
/// Domain claim key holding the certificate container.
pub const CLAIM_HCERT: i64 = -260;
/// Key of the version-1 certificate payload inside the domain claim.
pub const HCERT_V1: i64 = 1;

/// The integer-keyed claim map carried as the envelope payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimSet {
    /// Issuer country or authority (claim 1).
    pub issuer: Option<String>,
    /// Issued-at timestamp, seconds since the epoch (claim 6).
    pub issued_at: Option<i64>,
    /// Expiration timestamp, seconds since the epoch (claim 4).
    pub expires_at: Option<i64>,
    /// The certificate payload nested under the domain claim.
    pub certificate: CertificatePayload,
}

impl ClaimSet {
    /// Assemble the claim map value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut claims = Vec::new();
        if let Some(issuer) = &self.issuer {
            claims.push((Value::Integer(CLAIM_ISSUER), Value::Text(issuer.clone())));
        }
        if let Some(expires_at) = self.expires_at {
            claims.push((Value::Integer(CLAIM_EXPIRES_AT), Value::Integer(expires_at)));
        }
        if let Some(issued_at) = self.issued_at {
            claims.push((Value::Integer(CLAIM_ISSUED_AT), Value::Integer(issued_at)));
        }
        claims.push((
            Value::Integer(CLAIM_HCERT),
            Value::Map(vec![(Value::Integer(HCERT_V1), self.certificate.to_value())]),
        ));
        Value::Map(claims)
    }

    /// Binary-encode the claim map.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        cbor::to_vec(&self.to_value())
    }

    /// Decode a claim map, descending through the domain claim to the
    /// certificate payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HcertError> {
        let value = cbor::from_slice(bytes)?;
        let value = value.untag();
        if value.as_map().is_none() {
            return Err(HcertError::Format("claim set must be a map"));
        }
        let container = value
            .map_get(CLAIM_HCERT)
            .ok_or(HcertError::Format("claim set missing domain claim"))?;
        let payload = container
            .map_get(HCERT_V1)
            .ok_or(HcertError::Format("domain claim missing certificate payload"))?;
        Ok(Self {
            issuer: value
                .map_get(CLAIM_ISSUER)
                .and_then(Value::as_text)
                .map(str::to_owned),
            issued_at: value.map_get(CLAIM_ISSUED_AT).and_then(Value::as_integer),
            expires_at: value.map_get(CLAIM_EXPIRES_AT).and_then(Value::as_integer),
            certificate: CertificatePayload::from_value(payload)?,
        })
    }
}

/// Extract the certificate payload from claim-set bytes without any
/// cryptographic check.
pub fn extract_certificate(claim_bytes: &[u8]) -> Result<CertificatePayload, HcertError> {
    ClaimSet::from_bytes(claim_bytes).map(|claims| claims.certificate)
}

/// The human-meaningful certificate record.
///
/// A conforming certificate populates exactly one of the three event
/// arrays; decoding is deliberately lenient (any subset, unknown keys
/// ignored) so diagnostic paths can surface nonconforming-but-decodable
/// payloads. Encoding emits only populated fields and arrays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificatePayload {
    /// Schema version ("ver").
    pub version: String,
    /// Subject name ("nam").
    pub name: PersonName,
    /// Date of birth ("dob"), ISO-8601 partial-date tolerant; carried as
    /// a string, never parsed.
    pub date_of_birth: String,
    /// Vaccination events ("v").
    pub vaccinations: Vec<VaccinationEntry>,
    /// Test events ("t").
    pub tests: Vec<TestEntry>,
    /// Recovery events ("r").
    pub recoveries: Vec<RecoveryEntry>,
}

impl CertificatePayload {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut entries = vec![
            (Value::Text("ver".to_owned()), Value::Text(self.version.clone())),
            (Value::Text("nam".to_owned()), self.name.to_value()),
            (Value::Text("dob".to_owned()), Value::Text(self.date_of_birth.clone())),
        ];
        if !self.vaccinations.is_empty() {
            entries.push((
                Value::Text("v".to_owned()),
                Value::Array(self.vaccinations.iter().map(VaccinationEntry::to_value).collect()),
            ));
        }
        if !self.tests.is_empty() {
            entries.push((
                Value::Text("t".to_owned()),
                Value::Array(self.tests.iter().map(TestEntry::to_value).collect()),
            ));
        }
        if !self.recoveries.is_empty() {
            entries.push((
                Value::Text("r".to_owned()),
                Value::Array(self.recoveries.iter().map(RecoveryEntry::to_value).collect()),
            ));
        }
        Value::Map(entries)
    }

    pub fn from_value(value: &Value) -> Result<Self, HcertError> {
        if value.as_map().is_none() {
            return Err(HcertError::Format("certificate payload must be a map"));
        }
        Ok(Self {
            version: req_text(value, "ver", "certificate missing 'ver'")?,
            name: PersonName::from_value(
                value
                    .map_get_text("nam")
                    .ok_or(HcertError::Format("certificate missing 'nam'"))?,
            )?,
            date_of_birth: req_text(value, "dob", "certificate missing 'dob'")?,
            vaccinations: event_array(value, "v", VaccinationEntry::from_value)?,
            tests: event_array(value, "t", TestEntry::from_value)?,
            recoveries: event_array(value, "r", RecoveryEntry::from_value)?,
        })
    }
}

/// Structured subject name: free-form parts plus their transliterations.
/// Only the transliterated surname is mandatory in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonName {
    /// Surname, free-form ("fn").
    pub family_name: Option<String>,
    /// Surname transliterated ("fnt").
    pub family_name_std: String,
    /// Given name, free-form ("gn").
    pub given_name: Option<String>,
    /// Given name transliterated ("gnt").
    pub given_name_std: Option<String>,
}

impl PersonName {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut entries = Vec::new();
        if let Some(family_name) = &self.family_name {
            entries.push((Value::Text("fn".to_owned()), Value::Text(family_name.clone())));
        }
        if let Some(given_name) = &self.given_name {
            entries.push((Value::Text("gn".to_owned()), Value::Text(given_name.clone())));
        }
        entries.push((Value::Text("fnt".to_owned()), Value::Text(self.family_name_std.clone())));
        if let Some(given_name_std) = &self.given_name_std {
            entries.push((Value::Text("gnt".to_owned()), Value::Text(given_name_std.clone())));
        }
        Value::Map(entries)
    }

    pub fn from_value(value: &Value) -> Result<Self, HcertError> {
        Ok(Self {
            family_name: opt_text(value, "fn"),
            family_name_std: req_text(value, "fnt", "name missing 'fnt'")?,
            given_name: opt_text(value, "gn"),
            given_name_std: opt_text(value, "gnt"),
        })
    }
}

/// One vaccination event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccinationEntry {
    /// Targeted disease code ("tg").
    pub disease: String,
    /// Vaccine or prophylaxis code ("vp").
    pub prophylaxis: String,
    /// Medicinal product code ("mp").
    pub product: String,
    /// Manufacturer code ("ma").
    pub manufacturer: String,
    /// Dose number in the series ("dn").
    pub dose_number: i64,
    /// Total doses in the series ("sd").
    pub series_doses: i64,
    /// Vaccination date ("dt").
    pub date: String,
    /// Country of vaccination ("co").
    pub country: String,
    /// Certificate issuing authority ("is").
    pub issuer: String,
    /// Unique certificate identifier ("ci").
    pub certificate_id: String,
}

impl VaccinationEntry {
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Text("tg".to_owned()), Value::Text(self.disease.clone())),
            (Value::Text("vp".to_owned()), Value::Text(self.prophylaxis.clone())),
            (Value::Text("mp".to_owned()), Value::Text(self.product.clone())),
            (Value::Text("ma".to_owned()), Value::Text(self.manufacturer.clone())),
            (Value::Text("dn".to_owned()), Value::Integer(self.dose_number)),
            (Value::Text("sd".to_owned()), Value::Integer(self.series_doses)),
            (Value::Text("dt".to_owned()), Value::Text(self.date.clone())),
            (Value::Text("co".to_owned()), Value::Text(self.country.clone())),
            (Value::Text("is".to_owned()), Value::Text(self.issuer.clone())),
            (Value::Text("ci".to_owned()), Value::Text(self.certificate_id.clone())),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, HcertError> {
        Ok(Self {
            disease: req_text(value, "tg", "vaccination missing 'tg'")?,
            prophylaxis: req_text(value, "vp", "vaccination missing 'vp'")?,
            product: req_text(value, "mp", "vaccination missing 'mp'")?,
            manufacturer: req_text(value, "ma", "vaccination missing 'ma'")?,
            dose_number: req_int(value, "dn", "vaccination missing 'dn'")?,
            series_doses: req_int(value, "sd", "vaccination missing 'sd'")?,
            date: req_text(value, "dt", "vaccination missing 'dt'")?,
            country: req_text(value, "co", "vaccination missing 'co'")?,
            issuer: req_text(value, "is", "vaccination missing 'is'")?,
            certificate_id: req_text(value, "ci", "vaccination missing 'ci'")?,
        })
    }
}

/// One test event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    /// Targeted disease code ("tg").
    pub disease: String,
    /// Test type code ("tt").
    pub test_type: String,
    /// Test name, NAAT only ("nm").
    pub test_name: Option<String>,
    /// Test device identifier, RAT only ("ma").
    pub device: Option<String>,
    /// Test result code ("tr").
    pub result: String,
    /// Sample collection timestamp ("sc").
    pub sample_collected: String,
    /// Result timestamp ("dr").
    pub result_date: Option<String>,
    /// Testing centre ("tc").
    pub testing_centre: Option<String>,
    /// Country of test ("co").
    pub country: String,
    /// Certificate issuing authority ("is").
    pub issuer: String,
    /// Unique certificate identifier ("ci").
    pub certificate_id: String,
}

impl TestEntry {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut entries = vec![
            (Value::Text("tg".to_owned()), Value::Text(self.disease.clone())),
            (Value::Text("tt".to_owned()), Value::Text(self.test_type.clone())),
        ];
        if let Some(test_name) = &self.test_name {
            entries.push((Value::Text("nm".to_owned()), Value::Text(test_name.clone())));
        }
        if let Some(device) = &self.device {
            entries.push((Value::Text("ma".to_owned()), Value::Text(device.clone())));
        }
        entries.push((Value::Text("tr".to_owned()), Value::Text(self.result.clone())));
        entries.push((Value::Text("sc".to_owned()), Value::Text(self.sample_collected.clone())));
        if let Some(result_date) = &self.result_date {
            entries.push((Value::Text("dr".to_owned()), Value::Text(result_date.clone())));
        }
        if let Some(testing_centre) = &self.testing_centre {
            entries.push((Value::Text("tc".to_owned()), Value::Text(testing_centre.clone())));
        }
        entries.push((Value::Text("co".to_owned()), Value::Text(self.country.clone())));
        entries.push((Value::Text("is".to_owned()), Value::Text(self.issuer.clone())));
        entries.push((Value::Text("ci".to_owned()), Value::Text(self.certificate_id.clone())));
        Value::Map(entries)
    }

    pub fn from_value(value: &Value) -> Result<Self, HcertError> {
        Ok(Self {
            disease: req_text(value, "tg", "test missing 'tg'")?,
            test_type: req_text(value, "tt", "test missing 'tt'")?,
            test_name: opt_text(value, "nm"),
            device: opt_text(value, "ma"),
            result: req_text(value, "tr", "test missing 'tr'")?,
            sample_collected: req_text(value, "sc", "test missing 'sc'")?,
            result_date: opt_text(value, "dr"),
            testing_centre: opt_text(value, "tc"),
            country: req_text(value, "co", "test missing 'co'")?,
            issuer: req_text(value, "is", "test missing 'is'")?,
            certificate_id: req_text(value, "ci", "test missing 'ci'")?,
        })
    }
}

/// One recovery event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEntry {
    /// Targeted disease code ("tg").
    pub disease: String,
    /// Date of first positive result ("fr").
    pub first_positive: String,
    /// Certificate valid from ("df").
    pub valid_from: String,
    /// Certificate valid until ("du").
    pub valid_until: String,
    /// Country of test ("co").
    pub country: String,
    /// Certificate issuing authority ("is").
    pub issuer: String,
    /// Unique certificate identifier ("ci").
    pub certificate_id: String,
}

impl RecoveryEntry {
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::Text("tg".to_owned()), Value::Text(self.disease.clone())),
            (Value::Text("fr".to_owned()), Value::Text(self.first_positive.clone())),
            (Value::Text("df".to_owned()), Value::Text(self.valid_from.clone())),
            (Value::Text("du".to_owned()), Value::Text(self.valid_until.clone())),
            (Value::Text("co".to_owned()), Value::Text(self.country.clone())),
            (Value::Text("is".to_owned()), Value::Text(self.issuer.clone())),
            (Value::Text("ci".to_owned()), Value::Text(self.certificate_id.clone())),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, HcertError> {
        Ok(Self {
            disease: req_text(value, "tg", "recovery missing 'tg'")?,
            first_positive: req_text(value, "fr", "recovery missing 'fr'")?,
            valid_from: req_text(value, "df", "recovery missing 'df'")?,
            valid_until: req_text(value, "du", "recovery missing 'du'")?,
            country: req_text(value, "co", "recovery missing 'co'")?,
            issuer: req_text(value, "is", "recovery missing 'is'")?,
            certificate_id: req_text(value, "ci", "recovery missing 'ci'")?,
        })
    }
}

// ——— Field helpers ——————————————————————————————————————————————————

fn req_text(map: &Value, key: &str, missing: &'static str) -> Result<String, HcertError> {
    map.map_get_text(key)
        .and_then(Value::as_text)
        .map(str::to_owned)
        .ok_or(HcertError::Format(missing))
}

fn opt_text(map: &Value, key: &str) -> Option<String> {
    map.map_get_text(key).and_then(Value::as_text).map(str::to_owned)
}

fn req_int(map: &Value, key: &str, missing: &'static str) -> Result<i64, HcertError> {
    map.map_get_text(key)
        .and_then(Value::as_integer)
        .ok_or(HcertError::Format(missing))
}

fn event_array<T>(
    map: &Value,
    key: &str,
    decode: impl Fn(&Value) -> Result<T, HcertError>,
) -> Result<Vec<T>, HcertError> {
    match map.map_get_text(key) {
        None => Ok(Vec::new()),
        Some(value) => {
            let items = value
                .as_array()
                .ok_or(HcertError::Format("event field must be an array"))?;
            items.iter().map(decode).collect()
        }
    }
}
