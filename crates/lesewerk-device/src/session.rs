// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Exclusive device session.
//
// All access to the reader passes through `with_device`, which serializes
// the entire open–operate–close interval and guarantees the close path on
// every exit.  Call sites get the release guarantee structurally instead of
// repeating try/finally blocks around each native call.
//
// Device lifetime policy: open-per-operation.  The handle is claimed when an
// operation starts and released before the coordinating call returns, so a
// reader unplugged between requests is noticed at the next open rather than
// poisoning a long-lived handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, warn};

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::DeviceInfo;

use crate::sdk::DocumentReader;

/// Owner of the single reader handle.
///
/// One instance per process, constructed at startup and shared via `Arc`.
/// The inner mutex spans whole device operations; operations run on blocking
/// worker threads so the async executor is never stalled by a slow native
/// call.
pub struct DeviceSession {
    reader: Arc<Mutex<Box<dyn DocumentReader>>>,
    timeout: Duration,
}

impl DeviceSession {
    pub fn new(reader: Box<dyn DocumentReader>, timeout: Duration) -> Self {
        Self {
            reader: Arc::new(Mutex::new(reader)),
            timeout,
        }
    }

    /// Run `op` with exclusive access to an open device.
    ///
    /// Opens the device (a no-op if a prior failed attempt left it open),
    /// invokes `op`, and unconditionally closes the device before returning
    /// or propagating an error.  Concurrent callers queue until the previous
    /// operation's device is closed.
    ///
    /// The whole interval is bounded by the session timeout: on expiry the
    /// caller observes `DeviceTimeout` while the worker thread finishes the
    /// operation and still runs the close path.
    pub async fn with_device<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut dyn DocumentReader) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let reader = Arc::clone(&self.reader);

        let task = tokio::task::spawn_blocking(move || {
            let mut guard = reader.lock().map_err(|_| {
                LesewerkError::DeviceCorrupted(
                    "device session lock poisoned, native layer state unknown".into(),
                )
            })?;
            let device = guard.as_mut();

            if !device.is_open() {
                device.open()?;
            } else {
                debug!("device already open from a prior attempt, reusing handle");
            }

            let outcome = op(device);

            let close_outcome = if device.is_open() {
                device.close()
            } else {
                Ok(())
            };

            match (outcome, close_outcome) {
                (Ok(value), Ok(())) => Ok(value),
                (Ok(_), Err(close_err)) => {
                    error!(error = %close_err, "device close failed after successful operation");
                    Err(close_err)
                }
                (Err(op_err), close_outcome) => {
                    if let Err(close_err) = close_outcome {
                        // The operation error is the one the caller needs;
                        // the close failure is only logged.
                        error!(error = %close_err, "device close failed after failed operation");
                    }
                    Err(op_err)
                }
            }
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.map_err(|e| {
                LesewerkError::DeviceCorrupted(format!("device worker panicked: {e}"))
            })?,
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "device operation exceeded its time budget, close path continues on worker"
                );
                Err(LesewerkError::DeviceTimeout(self.timeout.as_secs()))
            }
        }
    }

    /// Identity snapshot of the reader.  Does not open the device.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || {
            let guard = reader.lock().map_err(|_| {
                LesewerkError::DeviceCorrupted(
                    "device session lock poisoned, native layer state unknown".into(),
                )
            })?;
            Ok(guard.device_info())
        })
        .await
        .map_err(|e| LesewerkError::DeviceCorrupted(format!("device worker panicked: {e}")))?
    }

    /// Whether the device handle is currently claimed.  Blocks until any
    /// in-flight operation has released the session.
    pub async fn is_device_open(&self) -> Result<bool> {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || {
            let guard = reader.lock().map_err(|_| {
                LesewerkError::DeviceCorrupted(
                    "device session lock poisoned, native layer state unknown".into(),
                )
            })?;
            Ok(guard.is_open())
        })
        .await
        .map_err(|e| LesewerkError::DeviceCorrupted(format!("device worker panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedReader;
    use lesewerk_core::types::DocumentType;

    fn session_with(reader: SimulatedReader) -> DeviceSession {
        DeviceSession::new(Box::new(reader), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn device_is_closed_after_successful_operation() {
        let reader = SimulatedReader::new();
        let probe = reader.probe();
        let session = session_with(reader);

        let result = session
            .with_device(|dev| dev.read(DocumentType::Passport))
            .await
            .expect("read succeeds");

        assert_eq!(result.document_type, DocumentType::Passport);
        assert_eq!(probe.open_count(), 1);
        assert_eq!(probe.close_count(), 1);
        assert!(!session.is_device_open().await.expect("state query"));
    }

    #[tokio::test]
    async fn device_is_closed_after_failed_operation() {
        let reader = SimulatedReader::new().failing_reads(-17, "no document present");
        let probe = reader.probe();
        let session = session_with(reader);

        let err = session
            .with_device(|dev| dev.read(DocumentType::Passport))
            .await
            .unwrap_err();

        assert!(matches!(err, LesewerkError::ReadFailure { code: -17, .. }));
        assert_eq!(probe.close_count(), 1);
        assert!(!session.is_device_open().await.expect("state query"));
    }

    #[tokio::test]
    async fn open_failure_surfaces_device_unavailable() {
        let reader = SimulatedReader::new().absent();
        let probe = reader.probe();
        let session = session_with(reader);

        let err = session
            .with_device(|dev| dev.read(DocumentType::Passport))
            .await
            .unwrap_err();

        assert!(matches!(err, LesewerkError::DeviceUnavailable(_)));
        assert_eq!(probe.open_count(), 0);
        assert_eq!(probe.close_count(), 0);
    }

    #[tokio::test]
    async fn mid_read_drop_surfaces_device_lost() {
        let reader = SimulatedReader::new().dropping_mid_read();
        let probe = reader.probe();
        let session = session_with(reader);

        let err = session
            .with_device(|dev| dev.read(DocumentType::Passport))
            .await
            .unwrap_err();

        assert!(matches!(err, LesewerkError::DeviceLost(_)));
        // The drop itself released the handle; the session must not
        // double-close.
        assert_eq!(probe.close_count(), 1);
        assert!(!session.is_device_open().await.expect("state query"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_operations_never_overlap_on_the_device() {
        let reader = SimulatedReader::new().with_read_delay(Duration::from_millis(40));
        let probe = reader.probe();
        let session = Arc::new(session_with(reader));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                session
                    .with_device(|dev| dev.read(DocumentType::Passport))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("read succeeds");
        }

        assert_eq!(probe.open_count(), 4);
        assert_eq!(probe.close_count(), 4);
        assert!(!probe.has_overlapping_intervals());
    }

    #[tokio::test]
    async fn timeout_surfaces_but_close_path_still_runs() {
        let reader = SimulatedReader::new().with_read_delay(Duration::from_millis(1500));
        let probe = reader.probe();
        let session = DeviceSession::new(Box::new(reader), Duration::from_secs(1));

        let err = session
            .with_device(|dev| dev.read(DocumentType::Passport))
            .await
            .unwrap_err();
        assert!(matches!(err, LesewerkError::DeviceTimeout(1)));

        // The abandoned worker finishes the read and closes the device.
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(probe.close_count(), 1);
        assert!(!session.is_device_open().await.expect("state query"));
    }
}
