// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read coordinator.
//
// Orchestrates one read end-to-end: validate the stored configuration,
// resolve the per-type strategy, execute it inside the exclusive device
// session, and make the result observable — directly for manual reads,
// through the broadcast completion path for auto reads.
//
// Auto reads are fire-and-forget: the trigger returns once the strategy is
// resolved, the pipeline runs on a detached task, and the result becomes
// visible only through the mailbox once the read-done event has fired.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info, warn};

use lesewerk_core::error::Result;
use lesewerk_core::types::{DocumentType, ReadResult, ReaderEvent};
use lesewerk_device::session::DeviceSession;
use lesewerk_device::store::PropertyStore;

use crate::broadcast::EventBroadcaster;
use crate::mailbox::ResultMailbox;
use crate::strategy::ReadStrategy;

/// Entry point for all read requests.
pub struct ReadCoordinator {
    session: Arc<DeviceSession>,
    store: Arc<PropertyStore>,
    mailbox: Arc<ResultMailbox>,
    broadcaster: Arc<EventBroadcaster>,
    /// Number of triggered auto reads whose completion event has not yet
    /// been consumed.  Guards the completion callback against duplicate or
    /// unexpected native read-done events.
    pending_auto_reads: Arc<AtomicUsize>,
}

impl ReadCoordinator {
    /// Wire the coordinator and register the completion hook that moves
    /// auto-read results into the mailbox before subscribers are notified.
    pub fn new(
        session: Arc<DeviceSession>,
        store: Arc<PropertyStore>,
        mailbox: Arc<ResultMailbox>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        let pending_auto_reads = Arc::new(AtomicUsize::new(0));

        let callback_mailbox = Arc::clone(&mailbox);
        let callback_pending = Arc::clone(&pending_auto_reads);
        broadcaster.set_on_read_complete(move |result: Arc<ReadResult>| {
            let consumed = callback_pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if consumed {
                callback_mailbox.put(result);
            } else {
                // Duplicate or unexpected native completion event.
                warn!("read-done event with no outstanding auto read, ignored");
            }
        });

        Self {
            session,
            store,
            mailbox,
            broadcaster,
            pending_auto_reads,
        }
    }

    /// Synchronous read: the result is stored in the mailbox and returned to
    /// the caller in one step.  The value returned equals exactly what the
    /// mailbox holds at return time.
    pub async fn read_sync(&self, doc_type: DocumentType) -> Result<Arc<ReadResult>> {
        debug!(%doc_type, "manual read requested");

        let props = self.store.get();
        props.validate()?;

        let strategy = ReadStrategy::for_type(doc_type);
        let configured = strategy.configure(&props);

        let result = self
            .session
            .with_device(move |device| strategy.execute(device, &configured))
            .await?;

        let result = Arc::new(result);
        self.mailbox.put(Arc::clone(&result));
        info!(%doc_type, "manual read completed");
        Ok(result)
    }

    /// Fire-and-forget read: returns once the strategy is resolved, before
    /// the device is touched.  The result is observable only via the mailbox
    /// after the completion event; failures surface as `READ_FAILED` events.
    pub fn trigger_auto_read(&self, doc_type: DocumentType) -> Result<()> {
        debug!(%doc_type, "auto read triggered");

        let props = self.store.get();
        props.validate()?;

        let strategy = ReadStrategy::for_type(doc_type);
        let configured = strategy.configure(&props);

        self.pending_auto_reads.fetch_add(1, Ordering::SeqCst);

        let session = Arc::clone(&self.session);
        let broadcaster = Arc::clone(&self.broadcaster);
        let pending = Arc::clone(&self.pending_auto_reads);

        tokio::spawn(async move {
            broadcaster.publish(ReaderEvent::read_started(doc_type));

            let outcome = session
                .with_device(move |device| strategy.execute(device, &configured))
                .await;

            match outcome {
                Ok(result) => {
                    info!(%doc_type, "auto read completed");
                    broadcaster.publish_read_done(Arc::new(result));
                }
                Err(err) => {
                    error!(%doc_type, error = %err, "auto read failed");
                    // This trigger will never produce a completion event.
                    let _ = pending
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
                    broadcaster.publish(ReaderEvent::read_failed(doc_type, &err));
                }
            }
        });

        Ok(())
    }

    /// The mailbox this coordinator publishes into.
    pub fn mailbox(&self) -> &Arc<ResultMailbox> {
        &self.mailbox
    }
}
