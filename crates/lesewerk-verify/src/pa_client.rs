// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client for the remote Passive-Authentication verification service.
//
// PA proves that a document's data groups match the signed hash manifest in
// its security object (SOD) and that the signing certificate chains to a
// trusted CSCA.  All of that happens in the remote service; this client only
// extracts the raw bytes from a completed read, base64-encodes them, and
// forwards the payload.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::ReadResult;

/// Placeholder used when the MRZ did not yield a country or document number.
const UNKNOWN_FIELD: &str = "UNKNOWN";

/// Request payload for `POST /api/pa/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaVerificationRequest {
    pub issuing_country: String,
    pub document_number: String,
    /// Base64-encoded SOD bytes.
    pub sod: String,
    /// Base64-encoded data-group bytes keyed `DG1`..`DG16`.
    pub data_groups: BTreeMap<String, String>,
    pub requested_by: String,
}

impl PaVerificationRequest {
    /// Shape a verification request from the latest completed read.
    ///
    /// Fails when the result carries no security object or no data groups —
    /// without those the remote service has nothing to verify.
    pub fn from_read_result(result: &ReadResult, requested_by: &str) -> Result<Self> {
        let sod_bytes = result
            .sod_data
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                LesewerkError::Verification("security object missing from read result".into())
            })?;

        if result.data_groups.is_empty() {
            return Err(LesewerkError::Verification(
                "no data groups in read result".into(),
            ));
        }

        let issuing_country = match result.mrz.as_ref().map(|m| m.issuing_state.clone()) {
            Some(country) if !country.is_empty() => country,
            _ => {
                warn!("issuing country not found in MRZ data");
                UNKNOWN_FIELD.into()
            }
        };
        let document_number = match result.mrz.as_ref().map(|m| m.document_number.clone()) {
            Some(number) if !number.is_empty() => number,
            _ => {
                warn!("document number not found in MRZ data");
                UNKNOWN_FIELD.into()
            }
        };

        let data_groups = result
            .data_groups
            .iter()
            .map(|(index, bytes)| (format!("DG{index}"), BASE64.encode(bytes)))
            .collect();

        Ok(Self {
            issuing_country,
            document_number,
            sod: BASE64.encode(sod_bytes),
            data_groups,
            requested_by: requested_by.to_string(),
        })
    }
}

/// Certificate-chain portion of a verification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateChainValidation {
    pub valid: bool,
    pub dsc_subject: Option<String>,
    pub dsc_serial_number: Option<String>,
    pub csca_subject: Option<String>,
    pub csca_serial_number: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
    pub crl_checked: Option<bool>,
    pub revoked: Option<bool>,
    pub crl_status: Option<String>,
    pub crl_message: Option<String>,
    pub validation_errors: Option<String>,
}

/// SOD signature portion of a verification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SodSignatureValidation {
    pub valid: bool,
    pub signature_algorithm: Option<String>,
    pub hash_algorithm: Option<String>,
    pub validation_errors: Option<String>,
}

/// Per-data-group hash comparison detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGroupDetail {
    pub valid: bool,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

/// Data-group portion of a verification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGroupValidation {
    pub total_groups: u32,
    pub valid_groups: u32,
    pub invalid_groups: u32,
    pub details: Option<BTreeMap<String, DataGroupDetail>>,
}

/// One error reported by the verification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub severity: Option<String>,
}

/// Response payload of `POST /api/pa/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaVerificationResponse {
    pub status: String,
    pub verification_id: Option<Uuid>,
    pub verification_timestamp: Option<String>,
    pub issuing_country: Option<String>,
    pub document_number: Option<String>,
    pub certificate_chain_validation: Option<CertificateChainValidation>,
    pub sod_signature_validation: Option<SodSignatureValidation>,
    pub data_group_validation: Option<DataGroupValidation>,
    pub processing_duration_ms: Option<u64>,
    #[serde(default)]
    pub errors: Vec<PaError>,
}

impl PaVerificationResponse {
    pub fn is_valid(&self) -> bool {
        self.status == "VALID"
    }

    pub fn is_invalid(&self) -> bool {
        self.status == "INVALID"
    }

    pub fn has_error(&self) -> bool {
        self.status == "ERROR"
    }
}

/// HTTP client for the verification service.
pub struct PaClient {
    http: reqwest::Client,
    base_url: String,
}

impl PaClient {
    /// Build a client for the service at `base_url` with the given request
    /// timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LesewerkError::Verification(format!("build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a verification request.
    pub async fn verify(&self, request: &PaVerificationRequest) -> Result<PaVerificationResponse> {
        info!(
            country = %request.issuing_country,
            doc_number = %request.document_number,
            dg_count = request.data_groups.len(),
            "sending PA verification request"
        );

        let response = self
            .http
            .post(format!("{}/api/pa/verify", self.base_url))
            // Some PKD gateways reset kept-alive connections between
            // verifications.
            .header("Connection", "close")
            .json(request)
            .send()
            .await
            .map_err(|e| LesewerkError::Verification(format!("PA request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LesewerkError::Verification(format!(
                "PA service returned {status}: {body}"
            )));
        }

        let result: PaVerificationResponse = response
            .json()
            .await
            .map_err(|e| LesewerkError::Verification(format!("malformed PA response: {e}")))?;

        info!(
            status = %result.status,
            verification_id = ?result.verification_id,
            duration_ms = ?result.processing_duration_ms,
            "PA verification completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lesewerk_core::types::{DocumentType, MrzInfo};

    fn read_result_with_chip_data() -> ReadResult {
        ReadResult {
            document_type: DocumentType::Passport,
            mrz: Some(MrzInfo {
                document_number: "L898902C3".into(),
                issuing_state: "UTO".into(),
                surname: "ERIKSSON".into(),
                given_names: "ANNA MARIA".into(),
                nationality: "UTO".into(),
                birth_date: "740812".into(),
                sex: "F".into(),
                expiry_date: "120415".into(),
                personal_number: None,
            }),
            barcode: None,
            sod_data: Some(vec![0x77, 0x82, 0x01, 0x00]),
            data_groups: BTreeMap::from([(1, vec![0x61, 0x0B]), (2, vec![0x75, 0x82])]),
            sod_summary: None,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn request_encodes_payloads_as_base64_with_dg_keys() {
        let request =
            PaVerificationRequest::from_read_result(&read_result_with_chip_data(), "test-suite")
                .expect("request shaped");

        assert_eq!(request.issuing_country, "UTO");
        assert_eq!(request.document_number, "L898902C3");
        assert_eq!(request.sod, "d4IBAA==");
        assert_eq!(
            request.data_groups.keys().cloned().collect::<Vec<_>>(),
            vec!["DG1", "DG2"]
        );
        assert_eq!(request.data_groups["DG1"], "YQs=");
        assert_eq!(request.requested_by, "test-suite");
    }

    #[test]
    fn missing_sod_is_rejected() {
        let mut result = read_result_with_chip_data();
        result.sod_data = None;

        let err = PaVerificationRequest::from_read_result(&result, "test-suite").unwrap_err();
        assert!(matches!(err, LesewerkError::Verification(_)));
    }

    #[test]
    fn empty_data_groups_are_rejected() {
        let mut result = read_result_with_chip_data();
        result.data_groups.clear();

        let err = PaVerificationRequest::from_read_result(&result, "test-suite").unwrap_err();
        assert!(matches!(err, LesewerkError::Verification(_)));
    }

    #[test]
    fn missing_mrz_falls_back_to_unknown() {
        let mut result = read_result_with_chip_data();
        result.mrz = None;

        let request = PaVerificationRequest::from_read_result(&result, "test-suite")
            .expect("request shaped despite missing MRZ");
        assert_eq!(request.issuing_country, "UNKNOWN");
        assert_eq!(request.document_number, "UNKNOWN");
    }

    #[test]
    fn request_serializes_to_camel_case() {
        let request =
            PaVerificationRequest::from_read_result(&read_result_with_chip_data(), "test-suite")
                .expect("request shaped");
        let json = serde_json::to_value(&request).expect("serialize");

        assert!(json.get("issuingCountry").is_some());
        assert!(json.get("documentNumber").is_some());
        assert!(json.get("dataGroups").is_some());
        assert!(json.get("requestedBy").is_some());
    }

    #[test]
    fn response_status_helpers() {
        let response: PaVerificationResponse = serde_json::from_value(serde_json::json!({
            "status": "VALID",
            "verificationId": "8c0a9f52-0b3c-4a77-9e6f-0d6a2b3c4d5e",
            "processingDurationMs": 412
        }))
        .expect("deserialize");

        assert!(response.is_valid());
        assert!(!response.is_invalid());
        assert!(!response.has_error());
        assert_eq!(response.processing_duration_ms, Some(412));
        assert!(response.errors.is_empty());
    }
}
