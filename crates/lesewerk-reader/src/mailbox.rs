// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-slot holder of the most recent completed read result.
//
// Bridges the asynchronous completion path (native event → broadcast
// callback) to later synchronous HTTP queries.  Built on a watch channel so
// a write is one atomic exchange: readers observe either the previous or
// the new value, never a partial one, and neither side blocks.

use std::sync::Arc;

use tokio::sync::watch;

use lesewerk_core::types::ReadResult;

/// Last-value mailbox. Write is last-write-wins; older results are
/// discarded, not archived.
pub struct ResultMailbox {
    slot: watch::Sender<Option<Arc<ReadResult>>>,
}

impl ResultMailbox {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Store a completed result, replacing any previous one.
    pub fn put(&self, result: Arc<ReadResult>) {
        self.slot.send_replace(Some(result));
    }

    /// The most recent completed result, or `None` if no read has completed
    /// since startup (or since the last clear).
    pub fn get(&self) -> Option<Arc<ReadResult>> {
        self.slot.borrow().clone()
    }

    /// Discard the stored result.
    pub fn clear(&self) {
        self.slot.send_replace(None);
    }
}

impl Default for ResultMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lesewerk_core::types::DocumentType;
    use std::collections::BTreeMap;

    fn result(doc_type: DocumentType) -> Arc<ReadResult> {
        Arc::new(ReadResult {
            document_type: doc_type,
            mrz: None,
            barcode: None,
            sod_data: None,
            data_groups: BTreeMap::new(),
            sod_summary: None,
            completed_at: Utc::now(),
        })
    }

    #[test]
    fn empty_mailbox_returns_none() {
        let mailbox = ResultMailbox::new();
        assert!(mailbox.get().is_none());
    }

    #[test]
    fn last_write_wins() {
        let mailbox = ResultMailbox::new();
        mailbox.put(result(DocumentType::Passport));
        mailbox.put(result(DocumentType::Barcode));

        let stored = mailbox.get().expect("result stored");
        assert_eq!(stored.document_type, DocumentType::Barcode);
    }

    #[test]
    fn clear_empties_the_slot() {
        let mailbox = ResultMailbox::new();
        mailbox.put(result(DocumentType::Passport));
        mailbox.clear();
        assert!(mailbox.get().is_none());
    }

    #[test]
    fn readers_keep_their_snapshot_across_later_writes() {
        let mailbox = ResultMailbox::new();
        mailbox.put(result(DocumentType::Passport));

        let snapshot = mailbox.get().expect("first result");
        mailbox.put(result(DocumentType::IdCard));

        // The previously returned Arc still points at the old value.
        assert_eq!(snapshot.document_type, DocumentType::Passport);
        assert_eq!(
            mailbox.get().expect("second result").document_type,
            DocumentType::IdCard
        );
    }
}
