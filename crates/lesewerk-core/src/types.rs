// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lesewerk reader gateway.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LesewerkError;

/// Classification of the document placed on the reader.
///
/// Drives strategy selection. Unknown values are a caller error and are
/// rejected at parse time — there is no fallback type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Passport,
    IdCard,
    Barcode,
}

impl DocumentType {
    /// Lower-case identifier as used in URL paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::IdCard => "idcard",
            Self::Barcode => "barcode",
        }
    }
}

impl FromStr for DocumentType {
    type Err = LesewerkError;

    /// Case-insensitive parse; accepts the path segments and the legacy
    /// upper-case identifiers (`PASSPORT`, `IDCARD`, `BARCODE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passport" => Ok(Self::Passport),
            "idcard" => Ok(Self::IdCard),
            "barcode" => Ok(Self::Barcode),
            other => Err(LesewerkError::UnsupportedDocumentType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Light source for a single-page scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Infrared,
    Ultraviolet,
    White,
}

/// Identity snapshot of the attached reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

/// MRZ-equivalent identity fields extracted by the native layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrzInfo {
    pub document_number: String,
    /// Issuing state as an ICAO three-letter code.
    pub issuing_state: String,
    pub surname: String,
    pub given_names: String,
    pub nationality: String,
    /// Date of birth, `YYMMDD` as printed in the MRZ.
    pub birth_date: String,
    pub sex: String,
    /// Expiry date, `YYMMDD` as printed in the MRZ.
    pub expiry_date: String,
    pub personal_number: Option<String>,
}

/// Hash of one data group as recorded inside the security object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGroupHash {
    pub dg_number: u8,
    /// Hex-encoded hash value.
    pub hash: String,
}

/// Display summary of the parsed security object, produced by the native
/// layer. Certificate parsing itself happens outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SodSummary {
    pub digest_algorithm_oid: String,
    pub dg_hashes: Vec<DataGroupHash>,
    pub signer_subject: Option<String>,
    pub certificate_serial: Option<String>,
}

impl SodSummary {
    /// Human-readable name for the digest algorithm OID.
    pub fn digest_algorithm_name(&self) -> String {
        match self.digest_algorithm_oid.as_str() {
            "1.3.14.3.2.26" => "SHA-1".into(),
            "2.16.840.1.101.3.4.2.1" => "SHA-256".into(),
            "2.16.840.1.101.3.4.2.2" => "SHA-384".into(),
            "2.16.840.1.101.3.4.2.3" => "SHA-512".into(),
            "2.16.840.1.101.3.4.2.4" => "SHA-224".into(),
            "1.2.840.113549.1.1.5" => "SHA1withRSA".into(),
            "1.2.840.113549.1.1.11" => "SHA256withRSA".into(),
            "1.2.840.113549.1.1.12" => "SHA384withRSA".into(),
            "1.2.840.113549.1.1.13" => "SHA512withRSA".into(),
            other => format!("Unknown ({other})"),
        }
    }
}

/// Outcome of one completed read. Immutable once constructed; the most
/// recent instance is retained in the result mailbox, older ones are
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResult {
    pub document_type: DocumentType,
    pub mrz: Option<MrzInfo>,
    /// Decoded barcode payload, for barcode reads.
    pub barcode: Option<String>,
    /// Raw security-object (SOD) bytes, base64 on the wire.
    #[serde(with = "serde_b64_opt")]
    pub sod_data: Option<Vec<u8>>,
    /// Raw data-group bytes keyed by 1-based group index, base64 on the wire.
    #[serde(with = "serde_b64_map")]
    pub data_groups: BTreeMap<u8, Vec<u8>>,
    pub sod_summary: Option<SodSummary>,
    pub completed_at: DateTime<Utc>,
}

impl ReadResult {
    /// Push-channel summary of this result, excluding the raw binary fields
    /// (those remain retrievable over HTTP only).
    pub fn summary(&self) -> ReadResultSummary {
        ReadResultSummary {
            document_type: self.document_type,
            mrz: self.mrz.clone(),
            barcode: self.barcode.clone(),
            sod_size: self.sod_data.as_ref().map(|b| b.len()),
            data_groups: self
                .data_groups
                .iter()
                .map(|(index, bytes)| DataGroupEntry {
                    dg_number: *index,
                    size: bytes.len(),
                })
                .collect(),
            sod_summary: self.sod_summary.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Sizes of a single data group as carried in result summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGroupEntry {
    pub dg_number: u8,
    pub size: usize,
}

/// Broadcast-safe view of a `ReadResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResultSummary {
    pub document_type: DocumentType,
    pub mrz: Option<MrzInfo>,
    pub barcode: Option<String>,
    pub sod_size: Option<usize>,
    pub data_groups: Vec<DataGroupEntry>,
    pub sod_summary: Option<SodSummary>,
    pub completed_at: DateTime<Utc>,
}

/// Image captured by a single-page scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedPage {
    pub light: LightType,
    #[serde(with = "serde_b64")]
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Lifecycle event codes published on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    ReadStarted,
    ReadDone,
    ReadFailed,
}

impl EventCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadStarted => "READ_STARTED",
            Self::ReadDone => "READ_DONE",
            Self::ReadFailed => "READ_FAILED",
        }
    }
}

/// A single event as delivered to every push-channel subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderEvent {
    pub event: EventCode,
    pub document_type: DocumentType,
    /// Present on `READ_DONE` events.
    pub summary: Option<ReadResultSummary>,
    /// Present on `READ_FAILED` events.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReaderEvent {
    pub fn read_started(document_type: DocumentType) -> Self {
        Self {
            event: EventCode::ReadStarted,
            document_type,
            summary: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn read_done(result: &ReadResult) -> Self {
        Self {
            event: EventCode::ReadDone,
            document_type: result.document_type,
            summary: Some(result.summary()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn read_failed(document_type: DocumentType, error: &LesewerkError) -> Self {
        Self {
            event: EventCode::ReadFailed,
            document_type,
            summary: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Base64 serde helpers for raw binary fields
// ---------------------------------------------------------------------------

mod serde_b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod serde_b64_opt {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => ser.serialize_some(&STANDARD.encode(b)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(de)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod serde_b64_map {
    use std::collections::BTreeMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<u8, Vec<u8>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<u8, String> = map
            .iter()
            .map(|(k, v)| (*k, STANDARD.encode(v)))
            .collect();
        serde::Serialize::serialize(&encoded, ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<BTreeMap<u8, Vec<u8>>, D::Error> {
        let encoded: BTreeMap<u8, String> = BTreeMap::deserialize(de)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v)
                    .map(|bytes| (k, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
