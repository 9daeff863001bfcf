// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// TCP port for the HTTP/WebSocket gateway.
    pub server_port: u16,
    /// Upper bound on one device open–operate–close interval, in seconds.
    /// On expiry the caller sees a timeout while the close path still runs.
    pub device_timeout_secs: u64,
    /// Base URL of the remote Passive-Authentication service.
    pub pa_base_url: String,
    /// Request timeout for PA verification calls, in seconds.
    pub pa_timeout_secs: u64,
    /// Identifier sent as `requestedBy` in PA verification requests.
    pub pa_requested_by: String,
    /// Enable the read audit trail.
    pub audit_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 8475,
            device_timeout_secs: 30,
            pa_base_url: "http://localhost:8181".into(),
            pa_timeout_secs: 20,
            pa_requested_by: "lesewerk-gateway".into(),
            audit_enabled: true,
        }
    }
}
