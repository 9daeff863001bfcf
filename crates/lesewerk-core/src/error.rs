// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.

use thiserror::Error;

/// Top-level error type for all Lesewerk operations.
#[derive(Debug, Error)]
pub enum LesewerkError {
    // -- Device errors --
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("device connection lost: {0}")]
    DeviceLost(String),

    #[error("device operation timed out after {0} seconds")]
    DeviceTimeout(u64),

    /// The native layer itself is in a broken state. Unlike the other device
    /// conditions this one is not expected to clear on retry and requires
    /// operator intervention.
    #[error("native reader layer corrupted: {0}")]
    DeviceCorrupted(String),

    // -- Read errors --
    #[error("unsupported document type: {0}")]
    UnsupportedDocumentType(String),

    #[error("document read failed ({code}): {message}")]
    ReadFailure { code: i32, message: String },

    #[error("invalid device configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("no completed read result available")]
    NoResult,

    // -- Verification errors --
    #[error("passive authentication failed: {0}")]
    Verification(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;

impl LesewerkError {
    /// Whether a subsequent request may succeed without operator action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DeviceCorrupted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_corrupted_is_not_recoverable() {
        let err = LesewerkError::DeviceCorrupted("poisoned handle".into());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn request_level_errors_are_recoverable() {
        for err in [
            LesewerkError::DeviceUnavailable("no device".into()),
            LesewerkError::DeviceLost("mid-read".into()),
            LesewerkError::DeviceTimeout(30),
            LesewerkError::UnsupportedDocumentType("PASSPORT_V2".into()),
            LesewerkError::ReadFailure {
                code: -17,
                message: "empty chip".into(),
            },
            LesewerkError::ConfigurationInvalid("two primary subsystems".into()),
        ] {
            assert!(err.is_recoverable(), "{err} should be recoverable");
        }
    }
}
