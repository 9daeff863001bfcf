// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device configuration aggregate.
//
// A `DeviceProperties` value describes the full capture configuration of the
// reader: which subsystem is active (RF chip, barcode decoder, ID-card OCR),
// image-capture flags, the e-passport data-group selection, and the chip
// authentication methods to attempt.  The canonical snapshot lives in the
// `PropertyStore`; read strategies work on private copies and never mutate
// the store.

use serde::{Deserialize, Serialize};

/// Default RF read chunk size in bytes.
pub const DEFAULT_RF_READ_SIZE: u32 = 231;

/// Maximum RF read chunk size accepted by the reader firmware.
pub const MAX_RF_READ_SIZE: u32 = 4096;

/// Batch image-capture flags (which light sources to capture under).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCaptureFlags {
    /// Capture an infrared image.
    pub ir: bool,
    /// Capture an ultraviolet image.
    pub uv: bool,
    /// Capture a white-light image.
    pub wh: bool,
}

impl Default for BatchCaptureFlags {
    fn default() -> Self {
        Self {
            ir: true,
            uv: false,
            wh: true,
        }
    }
}

/// Which of the sixteen e-passport data groups to read from the chip.
///
/// Stored as sixteen explicit flags rather than a bitmask so the settings
/// form round-trips field-by-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGroupSelection {
    pub dg1: bool,
    pub dg2: bool,
    pub dg3: bool,
    pub dg4: bool,
    pub dg5: bool,
    pub dg6: bool,
    pub dg7: bool,
    pub dg8: bool,
    pub dg9: bool,
    pub dg10: bool,
    pub dg11: bool,
    pub dg12: bool,
    pub dg13: bool,
    pub dg14: bool,
    pub dg15: bool,
    pub dg16: bool,
}

impl Default for DataGroupSelection {
    /// DG1 (MRZ) and DG2 (face image) are read by default; the remaining
    /// groups are opt-in.
    fn default() -> Self {
        Self {
            dg1: true,
            dg2: true,
            dg3: false,
            dg4: false,
            dg5: false,
            dg6: false,
            dg7: false,
            dg8: false,
            dg9: false,
            dg10: false,
            dg11: false,
            dg12: false,
            dg13: false,
            dg14: false,
            dg15: false,
            dg16: false,
        }
    }
}

impl DataGroupSelection {
    /// All sixteen groups enabled.
    pub fn all() -> Self {
        Self {
            dg1: true,
            dg2: true,
            dg3: true,
            dg4: true,
            dg5: true,
            dg6: true,
            dg7: true,
            dg8: true,
            dg9: true,
            dg10: true,
            dg11: true,
            dg12: true,
            dg13: true,
            dg14: true,
            dg15: true,
            dg16: true,
        }
    }

    /// Whether the data group with the given 1-based index is selected.
    pub fn contains(&self, index: u8) -> bool {
        match index {
            1 => self.dg1,
            2 => self.dg2,
            3 => self.dg3,
            4 => self.dg4,
            5 => self.dg5,
            6 => self.dg6,
            7 => self.dg7,
            8 => self.dg8,
            9 => self.dg9,
            10 => self.dg10,
            11 => self.dg11,
            12 => self.dg12,
            13 => self.dg13,
            14 => self.dg14,
            15 => self.dg15,
            16 => self.dg16,
            _ => false,
        }
    }

    /// Indices of all selected groups, ascending.
    pub fn indices(&self) -> Vec<u8> {
        (1..=16).filter(|i| self.contains(*i)).collect()
    }
}

/// Chip authentication methods to attempt during an RF read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMethods {
    /// Passive Authentication.
    pub pa: bool,
    /// Active Authentication.
    pub aa: bool,
    /// Chip Authentication.
    pub ca: bool,
    /// Terminal Authentication.
    pub ta: bool,
    /// Supplemental Access Control (PACE).
    pub sac: bool,
}

impl Default for AuthMethods {
    fn default() -> Self {
        Self {
            pa: true,
            aa: false,
            ca: false,
            ta: false,
            sac: true,
        }
    }
}

/// Full capture configuration for the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProperties {
    /// Crop captured images to the document outline.
    pub crop: bool,
    /// Check whether the previously read document was removed from the tray.
    pub check_remove: bool,
    /// Enable the RF (contactless chip) subsystem.
    pub enable_rf: bool,
    /// Enable the barcode decoder subsystem.
    pub enable_barcode: bool,
    /// Enable the ID-card OCR subsystem.
    pub enable_id_card: bool,
    /// RF read chunk size in bytes (1..=4096, firmware default 231).
    pub rf_read_size: u32,
    /// Address chip files by Short File Identifier instead of full select.
    pub rf_use_sfi: bool,
    /// Skip chip authentication entirely (diagnostic mode).
    pub auth_bypass: bool,
    /// Brightness correction for IR captures.
    pub enhance_ir: bool,
    /// Brightness correction for UV captures.
    pub enhance_uv: bool,
    /// Brightness correction for white-light captures.
    pub enhance_wh: bool,
    /// Anti-glare processing for white-light captures.
    pub anti_glare: bool,
    /// Anti-glare processing for full IR scans.
    pub anti_glare_ir: bool,
    /// Anti-glare processing for the IR MRZ strip only.
    pub anti_glare_ir_half: bool,
    pub batch_capture: BatchCaptureFlags,
    pub data_groups: DataGroupSelection,
    pub auth_methods: AuthMethods,
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self {
            crop: true,
            check_remove: true,
            enable_rf: true,
            enable_barcode: false,
            enable_id_card: false,
            rf_read_size: DEFAULT_RF_READ_SIZE,
            rf_use_sfi: false,
            auth_bypass: false,
            enhance_ir: false,
            enhance_uv: false,
            enhance_wh: false,
            anti_glare: false,
            anti_glare_ir: false,
            anti_glare_ir_half: false,
            batch_capture: BatchCaptureFlags::default(),
            data_groups: DataGroupSelection::default(),
            auth_methods: AuthMethods::default(),
        }
    }
}

impl DeviceProperties {
    /// Number of subsystem-enable flags currently set.
    fn enabled_subsystems(&self) -> usize {
        [self.enable_rf, self.enable_barcode, self.enable_id_card]
            .iter()
            .filter(|f| **f)
            .count()
    }

    /// Reject contradictory configurations before they reach the device.
    ///
    /// Exactly one of {RF, barcode, ID-card} must be the primary subsystem,
    /// and the RF read size must stay within firmware limits.
    pub fn validate(&self) -> Result<(), crate::error::LesewerkError> {
        match self.enabled_subsystems() {
            0 => {
                return Err(crate::error::LesewerkError::ConfigurationInvalid(
                    "no capture subsystem enabled".into(),
                ));
            }
            1 => {}
            n => {
                return Err(crate::error::LesewerkError::ConfigurationInvalid(format!(
                    "{n} capture subsystems enabled, expected exactly one"
                )));
            }
        }

        if self.rf_read_size == 0 || self.rf_read_size > MAX_RF_READ_SIZE {
            return Err(crate::error::LesewerkError::ConfigurationInvalid(format!(
                "rf_read_size {} outside 1..={MAX_RF_READ_SIZE}",
                self.rf_read_size
            )));
        }

        Ok(())
    }
}
