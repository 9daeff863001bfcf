// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — initialises all backend subsystems and provides
// the methods the HTTP handlers call.
//
// All fields are cheaply cloneable (Arc-wrapped) so the struct can serve as
// axum state and be passed into spawned tasks without lifetime issues.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use lesewerk_core::config::AppConfig;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::properties::DeviceProperties;
use lesewerk_core::types::{DeviceInfo, DocumentType, LightType, ReadResult, ScannedPage};
use lesewerk_device::sdk::DocumentReader;
use lesewerk_device::session::DeviceSession;
use lesewerk_device::store::PropertyStore;
use lesewerk_reader::broadcast::EventBroadcaster;
use lesewerk_reader::coordinator::ReadCoordinator;
use lesewerk_reader::mailbox::ResultMailbox;
use lesewerk_verify::audit::{AuditEntry, AuditLog, document_ref};
use lesewerk_verify::pa_client::{PaClient, PaVerificationRequest, PaVerificationResponse};

/// Snapshot returned by `GET /device`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub open: bool,
}

/// Shared application services, one instance per process.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<DeviceSession>,
    store: Arc<PropertyStore>,
    mailbox: Arc<ResultMailbox>,
    broadcaster: Arc<EventBroadcaster>,
    coordinator: Arc<ReadCoordinator>,
    audit_log: Option<Arc<AuditLog>>,
    pa_client: Arc<PaClient>,
    config: AppConfig,
}

impl AppServices {
    /// Initialise all services with persistent storage under `data_dir`.
    ///
    /// Opens the settings and audit databases, wires the read pipeline, and
    /// reconciles settings with the device once (open → apply-or-pull →
    /// close) before any request is served.
    pub async fn init(
        config: AppConfig,
        reader: Box<dyn DocumentReader>,
        data_dir: &Path,
    ) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising app services");

        let store = PropertyStore::open(data_dir.join("settings.db"))?;
        let audit_log = if config.audit_enabled {
            Some(Arc::new(AuditLog::open(data_dir.join("audit.db"))?))
        } else {
            None
        };

        Self::assemble(config, reader, store, audit_log).await
    }

    /// Initialise with in-memory storage only.  Used when persistent storage
    /// is unavailable, and by tests.
    pub async fn fallback(config: AppConfig, reader: Box<dyn DocumentReader>) -> Result<Self> {
        let store = PropertyStore::open_in_memory()?;
        let audit_log = if config.audit_enabled {
            Some(Arc::new(AuditLog::open_in_memory()?))
        } else {
            None
        };

        Self::assemble(config, reader, store, audit_log).await
    }

    async fn assemble(
        config: AppConfig,
        reader: Box<dyn DocumentReader>,
        store: PropertyStore,
        audit_log: Option<Arc<AuditLog>>,
    ) -> Result<Self> {
        let session = Arc::new(DeviceSession::new(
            reader,
            Duration::from_secs(config.device_timeout_secs),
        ));
        let store = Arc::new(store);

        reconcile_settings(&session, &store).await?;

        let mailbox = Arc::new(ResultMailbox::new());
        let broadcaster = Arc::new(EventBroadcaster::new());
        let coordinator = Arc::new(ReadCoordinator::new(
            Arc::clone(&session),
            Arc::clone(&store),
            Arc::clone(&mailbox),
            Arc::clone(&broadcaster),
        ));

        let pa_client = Arc::new(PaClient::new(
            &config.pa_base_url,
            Duration::from_secs(config.pa_timeout_secs),
        )?);

        info!("app services initialised");
        Ok(Self {
            session,
            store,
            mailbox,
            broadcaster,
            coordinator,
            audit_log,
            pa_client,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    // -- Device --------------------------------------------------------------

    /// Identity and open/closed state of the reader.
    pub async fn device_status(&self) -> Result<DeviceStatus> {
        let info = self.session.device_info().await?;
        let open = self.session.is_device_open().await?;
        Ok(DeviceStatus { info, open })
    }

    /// Capture a single page under the given light source.
    pub async fn scan_page(&self, light: LightType) -> Result<ScannedPage> {
        self.session
            .with_device(move |device| device.scan_page(light))
            .await
    }

    // -- Reads ---------------------------------------------------------------

    /// Synchronous read; the result is returned inline and stored as the
    /// last result.
    pub async fn manual_read(&self, doc_type: DocumentType) -> Result<Arc<ReadResult>> {
        match self.coordinator.read_sync(doc_type).await {
            Ok(result) => {
                self.audit("manual_read", &result_ref(&result), true, None);
                Ok(result)
            }
            Err(err) => {
                self.audit(
                    "manual_read",
                    &document_ref(doc_type.as_str()),
                    false,
                    Some(&err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Fire-and-forget read; the result arrives via the push channel and the
    /// last-result endpoint.
    pub fn trigger_auto_read(&self, doc_type: DocumentType) -> Result<()> {
        self.coordinator.trigger_auto_read(doc_type)?;
        self.audit("auto_read", &document_ref(doc_type.as_str()), true, None);
        Ok(())
    }

    /// Most recent completed read, if any.
    pub fn last_result(&self) -> Option<Arc<ReadResult>> {
        self.mailbox.get()
    }

    /// Discard the stored last result.
    pub fn clear_last_result(&self) {
        self.mailbox.clear();
    }

    // -- Settings ------------------------------------------------------------

    pub fn device_settings(&self) -> DeviceProperties {
        self.store.get()
    }

    /// Validate and replace the device settings.
    pub fn set_device_settings(&self, props: DeviceProperties) -> Result<()> {
        props.validate()?;
        self.store.set(props)?;
        self.audit("settings_update", &document_ref("settings"), true, None);
        Ok(())
    }

    // -- Verification --------------------------------------------------------

    /// Run Passive Authentication against the latest read result.
    pub async fn verify_last_result(&self) -> Result<PaVerificationResponse> {
        let result = self.mailbox.get().ok_or(LesewerkError::NoResult)?;
        let request =
            PaVerificationRequest::from_read_result(&result, &self.config.pa_requested_by)?;
        let doc_ref = result_ref(&result);

        match self.pa_client.verify(&request).await {
            Ok(response) => {
                self.audit(
                    "pa_verify",
                    &doc_ref,
                    !response.has_error(),
                    Some(&format!("status {}", response.status)),
                );
                Ok(response)
            }
            Err(err) => {
                self.audit("pa_verify", &doc_ref, false, Some(&err.to_string()));
                Err(err)
            }
        }
    }

    // -- Audit trail ---------------------------------------------------------

    /// Record an audit entry (convenience wrapper).  Audit failures are
    /// logged, never propagated into the request path.
    fn audit(&self, action: &str, doc_ref: &str, success: bool, details: Option<&str>) {
        if let Some(log) = &self.audit_log
            && let Err(e) = log.record(action, doc_ref, success, details)
        {
            error!(error = %e, "failed to record audit entry");
        }
    }

    /// Most recent audit entries, newest first.
    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        match &self.audit_log {
            Some(log) => log.recent_entries(limit),
            None => Ok(Vec::new()),
        }
    }
}

/// Audit reference for a completed read: the hashed document number when the
/// MRZ yielded one, otherwise the document type.
fn result_ref(result: &ReadResult) -> String {
    match result.mrz.as_ref() {
        Some(mrz) => document_ref(&mrz.document_number),
        None => document_ref(result.document_type.as_str()),
    }
}

/// One-time settings reconciliation with the device at startup.
///
/// If a persisted snapshot exists it is pushed to the device; otherwise the
/// device's own initial configuration is pulled and persisted.  Either way
/// the device is closed again before the gateway starts serving.
async fn reconcile_settings(session: &Arc<DeviceSession>, store: &Arc<PropertyStore>) -> Result<()> {
    if store.had_saved_settings() {
        let props = store.get();
        session
            .with_device(move |device| device.apply_properties(&props))
            .await?;
        info!("applied saved settings to device");
    } else {
        let initial = session.with_device(|device| device.properties()).await?;
        store.set(initial)?;
        warn!("no saved settings found, persisted the device's initial configuration");
    }
    Ok(())
}
