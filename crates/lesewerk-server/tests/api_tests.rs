// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP surface tests against a gateway spun up on an ephemeral port, backed
// by the simulated reader.

use std::time::Duration;

use lesewerk_core::config::AppConfig;
use lesewerk_device::sim::SimulatedReader;
use lesewerk_server::{AppServices, build_router};

/// Spin up the gateway on an OS-assigned port, returning the base URL.
async fn spawn_test_server() -> String {
    let services = AppServices::fallback(AppConfig::default(), Box::new(SimulatedReader::new()))
        .await
        .expect("services init");
    let app = build_router(services);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn device_endpoint_reports_identity_and_closed_state() {
    let base = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/device")).await.expect("get");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["model"], "Lesewerk SIM-100");
    assert_eq!(body["open"], false);
}

#[tokio::test]
async fn manual_read_returns_result_inline_and_stores_it() {
    let base = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/passport/manual-read"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["mrz"]["document_number"], "L898902C3");
    assert_eq!(body["document_type"], "Passport");
    assert!(body["sod_data"].is_string(), "raw SOD is base64 over HTTP");

    // The same result is now the last result.
    let resp = reqwest::get(format!("{base}/passport/get-last-result"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 200);
    let stored: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(stored["mrz"]["document_number"], "L898902C3");
}

#[tokio::test]
async fn unknown_document_type_is_a_bad_request() {
    let base = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/passport_v2/manual-read"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert!(
        body["detail"]
            .as_str()
            .expect("detail string")
            .contains("unsupported document type")
    );
}

#[tokio::test]
async fn last_result_is_empty_before_any_read() {
    let base = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/barcode/get-last-result"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn auto_read_returns_202_and_result_arrives_later() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/barcode/run-auto-read"))
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), 202);
    assert!(resp.bytes().await.expect("body").is_empty());

    // Poll until the detached pipeline publishes the result.
    let mut stored = None;
    for _ in 0..50 {
        let resp = reqwest::get(format!("{base}/barcode/get-last-result"))
            .await
            .expect("get");
        if resp.status() == 200 {
            stored = Some(resp.json::<serde_json::Value>().await.expect("json"));
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let stored = stored.expect("auto read result never arrived");
    assert_eq!(stored["barcode"], "9771234567003");
}

#[tokio::test]
async fn device_settings_round_trip() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = reqwest::get(format!("{base}/device-setting"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 200);
    let mut settings: serde_json::Value = resp.json().await.expect("json");

    settings["rf_read_size"] = serde_json::json!(1024);
    let resp = client
        .post(format!("{base}/device-setting"))
        .json(&settings)
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), 204);

    let stored: serde_json::Value = reqwest::get(format!("{base}/device-setting"))
        .await
        .expect("get")
        .json()
        .await
        .expect("json");
    assert_eq!(stored["rf_read_size"], 1024);
}

#[tokio::test]
async fn contradictory_settings_are_rejected() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let mut settings: serde_json::Value = reqwest::get(format!("{base}/device-setting"))
        .await
        .expect("get")
        .json()
        .await
        .expect("json");
    settings["enable_rf"] = serde_json::json!(true);
    settings["enable_barcode"] = serde_json::json!(true);

    let resp = client
        .post(format!("{base}/device-setting"))
        .json(&settings)
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), 422);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["category"], "unexpected");
    assert_eq!(body["retriable"], false);
}

#[tokio::test]
async fn clearing_the_last_result_empties_the_mailbox() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    reqwest::get(format!("{base}/passport/manual-read"))
        .await
        .expect("read");

    let resp = client
        .delete(format!("{base}/last-result"))
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), 204);

    let resp = reqwest::get(format!("{base}/passport/get-last-result"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn scan_page_returns_an_image() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/scan-page"))
        .json(&serde_json::json!({ "light": "infrared" }))
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["light"], "infrared");
    assert_eq!(body["width"], 1600);
    assert!(body["image"].is_string());
}

#[tokio::test]
async fn audit_trail_records_reads() {
    let base = spawn_test_server().await;

    reqwest::get(format!("{base}/passport/manual-read"))
        .await
        .expect("read");

    let entries: serde_json::Value = reqwest::get(format!("{base}/audit?limit=10"))
        .await
        .expect("get")
        .json()
        .await
        .expect("json");

    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "manual_read");
    assert_eq!(entries[0]["success"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;

    let resp = reqwest::get(format!("{base}/nonexistent"))
        .await
        .expect("get");
    assert_eq!(resp.status(), 404);
}
