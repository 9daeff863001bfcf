// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk Server — HTTP/WebSocket gateway wiring.  Exposed as a library so
// integration tests can spin the router up on an ephemeral port.

pub mod routes;
pub mod services;
pub mod ws;

pub use routes::build_router;
pub use services::AppServices;
