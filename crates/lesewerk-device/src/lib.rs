// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk Device — the seam to the native reader SDK, the exclusive
// `DeviceSession` wrapper every device operation must pass through, the
// persistent settings store, and a simulated reader for development and
// tests.

pub mod sdk;
pub mod session;
pub mod sim;
pub mod store;

pub use sdk::DocumentReader;
pub use session::DeviceSession;
pub use sim::{ReaderProbe, SimulatedReader};
pub use store::PropertyStore;
