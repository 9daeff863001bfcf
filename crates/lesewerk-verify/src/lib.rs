// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk Verify — client for the remote Passive-Authentication service
// and the append-only audit trail of read/verification operations.  The
// verification algorithm itself is external; this crate only shapes
// well-formed byte payloads from the latest read result and records what
// happened.

pub mod audit;
pub mod pa_client;

pub use audit::{AuditEntry, AuditLog};
pub use pa_client::{PaClient, PaVerificationRequest, PaVerificationResponse};
