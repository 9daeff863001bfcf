// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP surface of the gateway.
//
// The core exposes only typed error conditions; this boundary translates
// them into status codes plus the generic display categories from
// `human_errors` before anything reaches a client.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use serde::Deserialize;
use tracing::warn;

use lesewerk_core::error::LesewerkError;
use lesewerk_core::human_errors::humanize_error;
use lesewerk_core::properties::DeviceProperties;
use lesewerk_core::types::{DocumentType, LightType};

use crate::services::AppServices;
use crate::ws;

/// Build the gateway router.
pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/device", get(device_status))
        .route("/{doc_type}/manual-read", get(manual_read))
        .route("/{doc_type}/run-auto-read", post(run_auto_read))
        .route("/{doc_type}/get-last-result", get(get_last_result))
        .route("/last-result", delete(clear_last_result))
        .route(
            "/device-setting",
            get(get_device_setting).post(set_device_setting),
        )
        .route("/scan-page", post(scan_page))
        .route("/verify", post(verify_last_result))
        .route("/audit", get(recent_audit))
        .route("/events", get(ws::events_handler))
        .with_state(services)
}

// ---------------------------------------------------------------------------
// Error translation
// ---------------------------------------------------------------------------

/// Boundary wrapper turning a `LesewerkError` into an HTTP response.
pub struct ApiError(LesewerkError);

impl From<LesewerkError> for ApiError {
    fn from(err: LesewerkError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LesewerkError::UnsupportedDocumentType(_) => StatusCode::BAD_REQUEST,
            LesewerkError::ConfigurationInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LesewerkError::NoResult => StatusCode::NOT_FOUND,
            LesewerkError::DeviceUnavailable(_) | LesewerkError::DeviceLost(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LesewerkError::DeviceTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LesewerkError::Verification(_) => StatusCode::BAD_GATEWAY,
            LesewerkError::ReadFailure { .. }
            | LesewerkError::DeviceCorrupted(_)
            | LesewerkError::Database(_)
            | LesewerkError::Io(_)
            | LesewerkError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        warn!(error = %self.0, %status, "request failed");

        let human = humanize_error(&self.0);
        let body = serde_json::json!({
            "category": human.category,
            "message": human.message,
            "suggestion": human.suggestion,
            "retriable": human.retriable,
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn parse_doc_type(raw: &str) -> Result<DocumentType, ApiError> {
    raw.parse::<DocumentType>().map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn device_status(State(services): State<AppServices>) -> Result<Response, ApiError> {
    let status = services.device_status().await?;
    Ok(Json(status).into_response())
}

async fn manual_read(
    State(services): State<AppServices>,
    Path(doc_type): Path<String>,
) -> Result<Response, ApiError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let result = services.manual_read(doc_type).await?;
    Ok(Json((*result).clone()).into_response())
}

async fn run_auto_read(
    State(services): State<AppServices>,
    Path(doc_type): Path<String>,
) -> Result<Response, ApiError> {
    let doc_type = parse_doc_type(&doc_type)?;
    services.trigger_auto_read(doc_type)?;
    // 202: the read runs detached; the result arrives on the push channel.
    Ok(StatusCode::ACCEPTED.into_response())
}

async fn get_last_result(
    State(services): State<AppServices>,
    Path(doc_type): Path<String>,
) -> Result<Response, ApiError> {
    // The path segment is validated even though the mailbox is shared across
    // types; unknown types stay a caller error.
    parse_doc_type(&doc_type)?;

    match services.last_result() {
        Some(result) => Ok(Json((*result).clone()).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn clear_last_result(State(services): State<AppServices>) -> StatusCode {
    services.clear_last_result();
    StatusCode::NO_CONTENT
}

async fn get_device_setting(State(services): State<AppServices>) -> Json<DeviceProperties> {
    Json(services.device_settings())
}

async fn set_device_setting(
    State(services): State<AppServices>,
    Json(props): Json<DeviceProperties>,
) -> Result<Response, ApiError> {
    services.set_device_settings(props)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct ScanPageRequest {
    light: LightType,
}

async fn scan_page(
    State(services): State<AppServices>,
    Json(request): Json<ScanPageRequest>,
) -> Result<Response, ApiError> {
    let page = services.scan_page(request.light).await?;
    Ok(Json(page).into_response())
}

async fn verify_last_result(State(services): State<AppServices>) -> Result<Response, ApiError> {
    let response = services.verify_last_result().await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<u32>,
}

async fn recent_audit(
    State(services): State<AppServices>,
    Query(query): Query<AuditQuery>,
) -> Result<Response, ApiError> {
    let entries = services.recent_audit_entries(query.limit.unwrap_or(50))?;
    Ok(Json(entries).into_response())
}
