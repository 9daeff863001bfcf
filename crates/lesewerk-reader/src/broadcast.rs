// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fan-out publisher for reader lifecycle events.
//
// Every connected push-channel client gets its own bounded queue; delivery
// is best-effort per subscriber.  A stalled WebSocket fills its queue and
// starts dropping events, but it can never stall the publisher, the other
// subscribers, or the device-closing path.
//
// Ordering invariant: the registered completion callback runs synchronously
// inside `publish_read_done`, before any subscriber is handed the event, so
// the result mailbox always reflects a read before its completion
// notification is observable.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use lesewerk_core::types::{ReadResult, ReaderEvent};

use std::sync::Arc;

/// Events a subscriber may lag behind before drops start.
const SUBSCRIBER_BUFFER: usize = 32;

/// Opaque handle identifying one push-channel subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live subscription: the id for later unsubscription plus the event
/// receiver to drain.
pub struct EventSubscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<ReaderEvent>,
}

type CompletionCallback = Box<dyn Fn(Arc<ReadResult>) + Send + Sync>;

/// Fan-out publisher with an optional read-completion hook.
pub struct EventBroadcaster {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<ReaderEvent>>>,
    on_read_complete: Mutex<Option<CompletionCallback>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            on_read_complete: Mutex::new(None),
        }
    }

    /// Register a new subscriber. Membership changes are independent of the
    /// read lifecycle and never block a broadcast in progress for long: the
    /// registry lock is only held for the map operation itself.
    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = SubscriberId(Uuid::new_v4());
        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, tx);
        debug!(subscriber = %id, "push-channel client subscribed");
        EventSubscription { id, receiver: rx }
    }

    /// Remove a subscriber. Unknown ids are ignored (disconnect races).
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .remove(&id)
            .is_some()
        {
            debug!(subscriber = %id, "push-channel client unsubscribed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }

    /// Register the hook invoked once per terminal read-done event.
    pub fn set_on_read_complete(
        &self,
        callback: impl Fn(Arc<ReadResult>) + Send + Sync + 'static,
    ) {
        *self
            .on_read_complete
            .lock()
            .expect("completion callback lock poisoned") = Some(Box::new(callback));
    }

    /// Fan an event out to every current subscriber, best-effort.
    pub fn publish(&self, event: ReaderEvent) {
        let mut gone = Vec::new();
        {
            let subscribers = self
                .subscribers
                .lock()
                .expect("subscriber registry poisoned");
            for (id, tx) in subscribers.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(subscriber = %id, event = ?event.event, "subscriber queue full, event dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        gone.push(*id);
                    }
                }
            }
        }
        for id in gone {
            debug!(subscriber = %id, "pruning disconnected subscriber");
            self.unsubscribe(id);
        }
    }

    /// Publish a terminal read-done event.
    ///
    /// Invokes the completion callback synchronously with the full result
    /// *before* fan-out, so the mailbox update happens-before any
    /// notification delivery.  Subscribers receive only the result summary.
    pub fn publish_read_done(&self, result: Arc<ReadResult>) {
        {
            let callback = self
                .on_read_complete
                .lock()
                .expect("completion callback lock poisoned");
            if let Some(cb) = callback.as_ref() {
                cb(Arc::clone(&result));
            }
        }
        self.publish(ReaderEvent::read_done(&result));
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lesewerk_core::types::{DocumentType, EventCode};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn sample_result() -> Arc<ReadResult> {
        Arc::new(ReadResult {
            document_type: DocumentType::Passport,
            mrz: None,
            barcode: None,
            sod_data: Some(vec![1, 2, 3]),
            data_groups: BTreeMap::new(),
            sod_summary: None,
            completed_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let broadcaster = EventBroadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.publish(ReaderEvent::read_started(DocumentType::Passport));

        assert_eq!(
            first.receiver.recv().await.expect("event").event,
            EventCode::ReadStarted
        );
        assert_eq!(
            second.receiver.recv().await.expect("event").event,
            EventCode::ReadStarted
        );
    }

    #[tokio::test]
    async fn unsubscribed_client_stops_receiving() {
        let broadcaster = EventBroadcaster::new();
        let subscription = broadcaster.subscribe();
        broadcaster.unsubscribe(subscription.id);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn full_subscriber_does_not_block_the_others() {
        let broadcaster = EventBroadcaster::new();
        let stalled = broadcaster.subscribe();
        let mut healthy = broadcaster.subscribe();

        // Overfill the stalled subscriber's queue; publish must not block.
        for _ in 0..(SUBSCRIBER_BUFFER + 8) {
            broadcaster.publish(ReaderEvent::read_started(DocumentType::Barcode));
        }

        // The healthy subscriber received up to its buffer, the publisher
        // never stalled, and the stalled one is still registered.
        assert_eq!(
            healthy.receiver.recv().await.expect("event").event,
            EventCode::ReadStarted
        );
        assert_eq!(broadcaster.subscriber_count(), 2);
        drop(stalled);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_on_next_publish() {
        let broadcaster = EventBroadcaster::new();
        let subscription = broadcaster.subscribe();
        drop(subscription.receiver);

        broadcaster.publish(ReaderEvent::read_started(DocumentType::Passport));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn completion_callback_runs_before_fanout() {
        let broadcaster = EventBroadcaster::new();
        let callback_ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&callback_ran);
        broadcaster.set_on_read_complete(move |_| {
            flag.store(true, Ordering::SeqCst);
        });

        let mut subscription = broadcaster.subscribe();
        broadcaster.publish_read_done(sample_result());

        // publish_read_done returned, so the callback has already run; only
        // then was the event queued for subscribers.
        assert!(callback_ran.load(Ordering::SeqCst));
        let event = subscription.receiver.recv().await.expect("event");
        assert_eq!(event.event, EventCode::ReadDone);
        let summary = event.summary.expect("read-done carries a summary");
        assert_eq!(summary.sod_size, Some(3));
    }

    #[tokio::test]
    async fn read_done_without_callback_still_fans_out() {
        let broadcaster = EventBroadcaster::new();
        let mut subscription = broadcaster.subscribe();

        broadcaster.publish_read_done(sample_result());

        let event = subscription.receiver.recv().await.expect("event");
        assert_eq!(event.event, EventCode::ReadDone);
    }
}
