// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error translation for the HTTP boundary.
//
// The core exposes only typed conditions; this module maps them to four
// generic display categories with plain-English guidance. Operators reading
// logs still get the full technical condition.

use crate::error::LesewerkError;

/// Generic display category for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The reader could not be reached or was lost mid-operation.
    ConnectionFailed,
    /// The operation ran but produced no usable document data.
    NoData,
    /// The operation exceeded its time budget.
    Timeout,
    /// Anything else.
    Unexpected,
}

/// A display-ready error with plain-English message and suggestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HumanError {
    pub category: ErrorCategory,
    pub message: String,
    pub suggestion: String,
    /// Whether retrying the request may succeed without operator action.
    pub retriable: bool,
}

/// Convert a `LesewerkError` into a `HumanError` for display.
pub fn humanize_error(err: &LesewerkError) -> HumanError {
    match err {
        LesewerkError::DeviceUnavailable(_) => HumanError {
            category: ErrorCategory::ConnectionFailed,
            message: "The document reader could not be opened.".into(),
            suggestion: "Check that the reader is connected and not in use by another application, then try again.".into(),
            retriable: true,
        },

        LesewerkError::DeviceLost(_) => HumanError {
            category: ErrorCategory::ConnectionFailed,
            message: "The connection to the document reader was lost.".into(),
            suggestion: "Reconnect the reader and try again.".into(),
            retriable: true,
        },

        LesewerkError::DeviceTimeout(secs) => HumanError {
            category: ErrorCategory::Timeout,
            message: format!("The reader did not finish within {secs} seconds."),
            suggestion: "Remove and re-place the document, then try again.".into(),
            retriable: true,
        },

        LesewerkError::DeviceCorrupted(_) => HumanError {
            category: ErrorCategory::Unexpected,
            message: "The reader driver is in a broken state.".into(),
            suggestion: "Restart the gateway service. If the problem persists, contact the operator.".into(),
            retriable: false,
        },

        LesewerkError::UnsupportedDocumentType(t) => HumanError {
            category: ErrorCategory::Unexpected,
            message: format!("\"{t}\" is not a readable document type."),
            suggestion: "Use one of: passport, idcard, barcode.".into(),
            retriable: false,
        },

        LesewerkError::ReadFailure { message, .. } => HumanError {
            category: ErrorCategory::NoData,
            message: "The document could not be read.".into(),
            suggestion: format!(
                "Place the document flat on the reader window and try again. ({message})"
            ),
            retriable: true,
        },

        LesewerkError::ConfigurationInvalid(detail) => HumanError {
            category: ErrorCategory::Unexpected,
            message: "The device settings are contradictory.".into(),
            suggestion: format!("Review the settings and save again. ({detail})"),
            retriable: false,
        },

        LesewerkError::NoResult => HumanError {
            category: ErrorCategory::NoData,
            message: "No read has completed yet.".into(),
            suggestion: "Run a read first, then fetch the result.".into(),
            retriable: true,
        },

        LesewerkError::Verification(detail) => HumanError {
            category: ErrorCategory::Unexpected,
            message: "Document verification could not be completed.".into(),
            suggestion: format!("Check the verification service and try again. ({detail})"),
            retriable: true,
        },

        LesewerkError::Database(_) | LesewerkError::Io(_) | LesewerkError::Serialization(_) => {
            HumanError {
                category: ErrorCategory::Unexpected,
                message: "An internal error occurred.".into(),
                suggestion: "Try again. If the problem persists, check the gateway logs.".into(),
                retriable: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_to_connection_failed() {
        let human = humanize_error(&LesewerkError::DeviceUnavailable("claimed".into()));
        assert_eq!(human.category, ErrorCategory::ConnectionFailed);
        assert!(human.retriable);

        let human = humanize_error(&LesewerkError::DeviceLost("usb gone".into()));
        assert_eq!(human.category, ErrorCategory::ConnectionFailed);
    }

    #[test]
    fn timeout_maps_to_timeout_category() {
        let human = humanize_error(&LesewerkError::DeviceTimeout(30));
        assert_eq!(human.category, ErrorCategory::Timeout);
        assert!(human.message.contains("30"));
    }

    #[test]
    fn read_failure_maps_to_no_data() {
        let human = humanize_error(&LesewerkError::ReadFailure {
            code: -17,
            message: "chip empty".into(),
        });
        assert_eq!(human.category, ErrorCategory::NoData);
        assert!(human.suggestion.contains("chip empty"));
    }

    #[test]
    fn corrupted_driver_is_not_retriable() {
        let human = humanize_error(&LesewerkError::DeviceCorrupted("poisoned".into()));
        assert!(!human.retriable);
        assert_eq!(human.category, ErrorCategory::Unexpected);
    }
}
