// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seam to the native reader SDK.
//
// The physical reader is driven by a vendor library; this trait is the only
// surface the rest of the workspace sees.  Implementations are free to block:
// all calls are made from `DeviceSession`, which runs them on a blocking
// worker thread while holding the session lock for the whole
// open–operate–close interval.  No other component may hold a reader handle.

use lesewerk_core::error::Result;
use lesewerk_core::properties::DeviceProperties;
use lesewerk_core::types::{DeviceInfo, DocumentType, LightType, ReadResult, ScannedPage};

/// Driver interface for one physical document reader.
///
/// # Contract
///
/// - [`open`](Self::open) on an already-open device is an idempotent no-op,
///   not an error.  A device that cannot be claimed surfaces
///   `DeviceUnavailable`.
/// - [`close`](Self::close) on a closed device is likewise a no-op.
/// - Operations against a device that unexpectedly reports closed surface
///   `DeviceLost`.
/// - [`read`](Self::read) runs to completion or native-level error; there is
///   no cancellation of an in-flight read.
pub trait DocumentReader: Send {
    /// Identity snapshot of the reader. Available without opening.
    fn device_info(&self) -> DeviceInfo;

    /// Whether the device handle is currently claimed.
    fn is_open(&self) -> bool;

    /// Claim the device handle.
    fn open(&mut self) -> Result<()>;

    /// Release the device handle.
    fn close(&mut self) -> Result<()>;

    /// Current configuration as reported by the device.
    fn properties(&self) -> Result<DeviceProperties>;

    /// Push a configuration to the device. Requires an open handle.
    fn apply_properties(&mut self, props: &DeviceProperties) -> Result<()>;

    /// Perform one read of the given document type. Requires an open handle.
    fn read(&mut self, doc_type: DocumentType) -> Result<ReadResult>;

    /// Capture a single page image under the given light source. Requires an
    /// open handle.
    fn scan_page(&mut self, light: LightType) -> Result<ScannedPage>;
}
