// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Push channel — one WebSocket endpoint fanning reader lifecycle events out
// to every connected client.
//
// Each connection gets its own subscription on the broadcaster; a client
// that stops draining only loses its own events.  Completion events carry
// the result summary; the raw binary fields stay on the HTTP surface.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{debug, warn};

use crate::services::AppServices;

/// `GET /events` — upgrade to a WebSocket event stream.
pub async fn events_handler(
    ws: WebSocketUpgrade,
    State(services): State<AppServices>,
) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, services))
}

async fn stream_events(mut socket: WebSocket, services: AppServices) {
    let subscription = services.broadcaster().subscribe();
    let id = subscription.id;
    let mut receiver = subscription.receiver;
    debug!(subscriber = %id, "event stream opened");

    loop {
        tokio::select! {
            event = receiver.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize reader event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Clients only listen on this channel; ignore anything
                    // they send short of closing.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    services.broadcaster().unsubscribe(id);
    debug!(subscriber = %id, "event stream closed");
}
