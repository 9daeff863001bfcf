// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk Reader — the read-orchestration layer.  Resolves a per-document-
// type strategy, executes it inside the exclusive device session, keeps the
// most recent result in a single-slot mailbox, and fans lifecycle events out
// to push-channel subscribers.

pub mod broadcast;
pub mod coordinator;
pub mod mailbox;
pub mod strategy;

pub use broadcast::{EventBroadcaster, EventSubscription, SubscriberId};
pub use coordinator::ReadCoordinator;
pub use mailbox::ResultMailbox;
pub use strategy::ReadStrategy;
