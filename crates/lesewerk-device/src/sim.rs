// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated reader for development and tests.
//
// Produces deterministic specimen documents (the ICAO 9303 sample MRZ data)
// and records open/close intervals through a shareable probe so tests can
// assert on session exclusivity without touching real hardware.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::properties::DeviceProperties;
use lesewerk_core::types::{
    DataGroupHash, DeviceInfo, DocumentType, LightType, MrzInfo, ReadResult, ScannedPage,
    SodSummary,
};

use crate::sdk::DocumentReader;

/// Shared instrumentation handle for a [`SimulatedReader`].
///
/// The reader itself is boxed away inside the `DeviceSession`; the probe
/// stays with the test and observes what happened to the hardware.
#[derive(Clone, Default)]
pub struct ReaderProbe {
    opens: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
    intervals: Arc<Mutex<Vec<(Instant, Instant)>>>,
    applied: Arc<Mutex<Vec<DeviceProperties>>>,
}

impl ReaderProbe {
    /// Number of successful open calls (idempotent re-opens not counted).
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of close calls that actually released the handle.
    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Recorded open→close intervals, in completion order.
    pub fn intervals(&self) -> Vec<(Instant, Instant)> {
        self.intervals.lock().expect("probe lock poisoned").clone()
    }

    /// Configurations pushed to the device, in order.
    pub fn applied_properties(&self) -> Vec<DeviceProperties> {
        self.applied.lock().expect("probe lock poisoned").clone()
    }

    /// Whether any two recorded open intervals overlap in time.
    pub fn has_overlapping_intervals(&self) -> bool {
        let mut intervals = self.intervals();
        intervals.sort_by_key(|(open, _)| *open);
        intervals
            .windows(2)
            .any(|pair| pair[0].1 > pair[1].0)
    }
}

/// Simulated document reader.
pub struct SimulatedReader {
    info: DeviceInfo,
    present: bool,
    open: bool,
    opened_at: Option<Instant>,
    read_delay: Duration,
    fail_reads: Option<(i32, String)>,
    drop_mid_read: bool,
    properties: DeviceProperties,
    probe: ReaderProbe,
}

impl SimulatedReader {
    pub fn new() -> Self {
        Self {
            info: DeviceInfo {
                model: "Lesewerk SIM-100".into(),
                serial_number: "SIM-0001".into(),
                firmware_version: "1.4.2".into(),
            },
            present: true,
            open: false,
            opened_at: None,
            read_delay: Duration::from_millis(5),
            fail_reads: None,
            drop_mid_read: false,
            properties: DeviceProperties::default(),
            probe: ReaderProbe::default(),
        }
    }

    /// Simulate a slow native read of the given duration.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Make every read fail with the given native code and message.
    pub fn failing_reads(mut self, code: i32, message: &str) -> Self {
        self.fail_reads = Some((code, message.to_string()));
        self
    }

    /// Simulate an unplugged reader: every open fails.
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    /// Simulate the device dropping off the bus mid-read.
    pub fn dropping_mid_read(mut self) -> Self {
        self.drop_mid_read = true;
        self
    }

    /// Instrumentation handle; clone before boxing the reader away.
    pub fn probe(&self) -> ReaderProbe {
        self.probe.clone()
    }

    fn record_close(&mut self) {
        if let Some(opened_at) = self.opened_at.take() {
            self.probe
                .intervals
                .lock()
                .expect("probe lock poisoned")
                .push((opened_at, Instant::now()));
        }
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.open = false;
    }

    fn specimen_result(&self, doc_type: DocumentType) -> ReadResult {
        match doc_type {
            DocumentType::Passport => self.specimen_passport(),
            DocumentType::IdCard => self.specimen_id_card(),
            DocumentType::Barcode => ReadResult {
                document_type: DocumentType::Barcode,
                mrz: None,
                barcode: Some("9771234567003".into()),
                sod_data: None,
                data_groups: BTreeMap::new(),
                sod_summary: None,
                completed_at: Utc::now(),
            },
        }
    }

    /// The ICAO 9303 specimen passport (Utopia / Anna Maria Eriksson).
    fn specimen_passport(&self) -> ReadResult {
        let mrz = MrzInfo {
            document_number: "L898902C3".into(),
            issuing_state: "UTO".into(),
            surname: "ERIKSSON".into(),
            given_names: "ANNA MARIA".into(),
            nationality: "UTO".into(),
            birth_date: "740812".into(),
            sex: "F".into(),
            expiry_date: "120415".into(),
            personal_number: Some("ZE184226B".into()),
        };

        let data_groups = self.selected_data_groups();
        let sod = specimen_sod_bytes(&data_groups);
        let summary = specimen_sod_summary(&data_groups);

        ReadResult {
            document_type: DocumentType::Passport,
            mrz: Some(mrz),
            barcode: None,
            sod_data: Some(sod),
            data_groups,
            sod_summary: Some(summary),
            completed_at: Utc::now(),
        }
    }

    /// The ICAO 9303 TD1 specimen identity card.
    fn specimen_id_card(&self) -> ReadResult {
        let mrz = MrzInfo {
            document_number: "D23145890".into(),
            issuing_state: "UTO".into(),
            surname: "ERIKSSON".into(),
            given_names: "ANNA MARIA".into(),
            nationality: "UTO".into(),
            birth_date: "740812".into(),
            sex: "F".into(),
            expiry_date: "120415".into(),
            personal_number: None,
        };

        let data_groups = self.selected_data_groups();
        let sod = specimen_sod_bytes(&data_groups);
        let summary = specimen_sod_summary(&data_groups);

        ReadResult {
            document_type: DocumentType::IdCard,
            mrz: Some(mrz),
            barcode: None,
            sod_data: Some(sod),
            data_groups,
            sod_summary: Some(summary),
            completed_at: Utc::now(),
        }
    }

    /// Deterministic payloads for whichever data groups the current
    /// configuration selects.
    fn selected_data_groups(&self) -> BTreeMap<u8, Vec<u8>> {
        self.properties
            .data_groups
            .indices()
            .into_iter()
            .map(|index| {
                let payload: Vec<u8> = format!("LESEWERK-SIM-DG{index:02}")
                    .into_bytes()
                    .iter()
                    .cycle()
                    .take(64 + usize::from(index) * 32)
                    .copied()
                    .collect();
                (index, payload)
            })
            .collect()
    }
}

impl Default for SimulatedReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Fake DER-ish SOD blob covering the given data groups.
fn specimen_sod_bytes(data_groups: &BTreeMap<u8, Vec<u8>>) -> Vec<u8> {
    let mut sod = vec![0x77, 0x82, 0x01, 0x00];
    for (index, bytes) in data_groups {
        sod.push(*index);
        sod.extend_from_slice(&Sha256::digest(bytes)[..8]);
    }
    sod
}

fn specimen_sod_summary(data_groups: &BTreeMap<u8, Vec<u8>>) -> SodSummary {
    SodSummary {
        digest_algorithm_oid: "2.16.840.1.101.3.4.2.1".into(),
        dg_hashes: data_groups
            .iter()
            .map(|(index, bytes)| DataGroupHash {
                dg_number: *index,
                hash: hex::encode(Sha256::digest(bytes)),
            })
            .collect(),
        signer_subject: Some("CN=DS Utopia 01,O=Utopia MOI,C=UT".into()),
        certificate_serial: Some("00:D4:15:C2".into()),
    }
}

impl DocumentReader for SimulatedReader {
    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<()> {
        if !self.present {
            return Err(LesewerkError::DeviceUnavailable(
                "no reader detected on any port".into(),
            ));
        }
        if self.open {
            debug!("open on already-open simulated reader — no-op");
            return Ok(());
        }
        self.open = true;
        self.opened_at = Some(Instant::now());
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            debug!("close on already-closed simulated reader — no-op");
            return Ok(());
        }
        self.record_close();
        Ok(())
    }

    fn properties(&self) -> Result<DeviceProperties> {
        Ok(self.properties.clone())
    }

    fn apply_properties(&mut self, props: &DeviceProperties) -> Result<()> {
        if !self.open {
            return Err(LesewerkError::DeviceLost(
                "reader reports closed during configuration".into(),
            ));
        }
        self.properties = props.clone();
        self.probe
            .applied
            .lock()
            .expect("probe lock poisoned")
            .push(props.clone());
        Ok(())
    }

    fn read(&mut self, doc_type: DocumentType) -> Result<ReadResult> {
        if !self.open {
            return Err(LesewerkError::DeviceLost(
                "reader reports closed at read start".into(),
            ));
        }

        std::thread::sleep(self.read_delay);

        if self.drop_mid_read {
            self.record_close();
            return Err(LesewerkError::DeviceLost(
                "reader dropped off the bus mid-read".into(),
            ));
        }

        if let Some((code, message)) = &self.fail_reads {
            return Err(LesewerkError::ReadFailure {
                code: *code,
                message: message.clone(),
            });
        }

        Ok(self.specimen_result(doc_type))
    }

    fn scan_page(&mut self, light: LightType) -> Result<ScannedPage> {
        if !self.open {
            return Err(LesewerkError::DeviceLost(
                "reader reports closed at scan start".into(),
            ));
        }

        std::thread::sleep(self.read_delay);

        // A tiny grey stub frame; real captures come from the vendor SDK.
        Ok(ScannedPage {
            light,
            image: vec![0x7F; 256],
            width: 1600,
            height: 1200,
        })
    }
}
