// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-document-type read strategies.
//
// Resolution is a total function over `DocumentType` — the enum-keyed match
// is exhaustiveness-checked, so adding a new document type without a
// strategy fails at compile time.  Each strategy configures a private copy
// of the device properties, enabling its own capture subsystem and
// explicitly disabling the other two so repeated reads of different types
// never inherit stale enable flags.

use lesewerk_core::error::Result;
use lesewerk_core::properties::{
    AuthMethods, BatchCaptureFlags, DataGroupSelection, DeviceProperties,
};
use lesewerk_core::types::{DocumentType, ReadResult};
use lesewerk_device::sdk::DocumentReader;

/// Configuration + read recipe for one document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStrategy {
    doc_type: DocumentType,
}

impl ReadStrategy {
    /// Resolve the strategy for a document type.  Total — every variant has
    /// exactly one strategy, and unknown types never reach this point (they
    /// are rejected when the request path is parsed).
    pub fn for_type(doc_type: DocumentType) -> Self {
        Self { doc_type }
    }

    pub fn document_type(&self) -> DocumentType {
        self.doc_type
    }

    /// Derive the capture configuration for this read from the stored
    /// snapshot.  Works on a copy; the canonical snapshot is untouched.
    pub fn configure(&self, base: &DeviceProperties) -> DeviceProperties {
        let mut props = base.clone();
        match self.doc_type {
            DocumentType::Passport => {
                props.enable_rf = true;
                props.enable_id_card = false;
                props.enable_barcode = false;
            }
            DocumentType::IdCard => {
                props.enable_id_card = true;
                props.enable_rf = false;
                props.enable_barcode = false;
                props.crop = true;
                props.check_remove = true;
                props.batch_capture = BatchCaptureFlags {
                    ir: true,
                    uv: true,
                    wh: true,
                };
                props.data_groups = DataGroupSelection::all();
                props.auth_methods = AuthMethods {
                    pa: true,
                    aa: true,
                    ca: false,
                    ta: false,
                    sac: false,
                };
            }
            DocumentType::Barcode => {
                props.enable_barcode = true;
                props.enable_rf = false;
                props.enable_id_card = false;
                props.crop = true;
                props.check_remove = true;
                props.batch_capture = BatchCaptureFlags {
                    ir: false,
                    uv: false,
                    wh: true,
                };
            }
        }
        props
    }

    /// Push the configured snapshot to the device and run the native read.
    pub fn execute(
        &self,
        device: &mut dyn DocumentReader,
        props: &DeviceProperties,
    ) -> Result<ReadResult> {
        device.apply_properties(props)?;
        device.read(self.doc_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(doc_type: DocumentType) -> DeviceProperties {
        ReadStrategy::for_type(doc_type).configure(&DeviceProperties::default())
    }

    #[test]
    fn passport_enables_only_rf() {
        let props = configured(DocumentType::Passport);
        assert!(props.enable_rf);
        assert!(!props.enable_barcode);
        assert!(!props.enable_id_card);
        props.validate().expect("exclusive configuration is valid");
    }

    #[test]
    fn id_card_enables_only_id_card() {
        let props = configured(DocumentType::IdCard);
        assert!(props.enable_id_card);
        assert!(!props.enable_rf);
        assert!(!props.enable_barcode);
        assert_eq!(props.data_groups.indices().len(), 16);
        assert!(props.auth_methods.pa && props.auth_methods.aa);
        assert!(!props.auth_methods.sac);
        props.validate().expect("exclusive configuration is valid");
    }

    #[test]
    fn barcode_enables_only_barcode() {
        let props = configured(DocumentType::Barcode);
        assert!(props.enable_barcode);
        assert!(!props.enable_rf);
        assert!(!props.enable_id_card);
        assert!(props.crop);
        assert!(props.check_remove);
        assert_eq!(
            props.batch_capture,
            BatchCaptureFlags {
                ir: false,
                uv: false,
                wh: true
            }
        );
        props.validate().expect("exclusive configuration is valid");
    }

    #[test]
    fn alternating_types_never_leak_enable_flags() {
        // A barcode read followed by a passport read must not leave the
        // barcode subsystem enabled, and vice versa.
        let after_barcode = configured(DocumentType::Barcode);
        let after_passport =
            ReadStrategy::for_type(DocumentType::Passport).configure(&after_barcode);
        assert!(after_passport.enable_rf);
        assert!(!after_passport.enable_barcode);
        assert!(!after_passport.enable_id_card);

        let back_to_barcode =
            ReadStrategy::for_type(DocumentType::Barcode).configure(&after_passport);
        assert!(back_to_barcode.enable_barcode);
        assert!(!back_to_barcode.enable_rf);
    }

    #[test]
    fn configure_does_not_mutate_the_base() {
        let base = DeviceProperties::default();
        let _ = ReadStrategy::for_type(DocumentType::Barcode).configure(&base);
        assert_eq!(base, DeviceProperties::default());
    }
}
