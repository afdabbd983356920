// src/routes/realtime.rs
//! Realtime WebSocket endpoint for the wattflow backend.
//!
//! `GET /ws/realtime` upgrades the connection and registers it with the
//! broadcast hub. The server pushes JSON-encoded measurement events; the
//! client is expected to send nothing meaningful (keepalive frames only).
//! Sibling module under `routes` per EMBP; only the subrouter is exported.
//!
//! Connection lifecycle: the socket is split into a send half fed from the
//! hub channel and a receive half that drains client frames to detect
//! close/error. Whichever task finishes first aborts the other, and the
//! handle is unsubscribed on the way out — an abrupt disconnect never
//! leaks a hub slot.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::{info, trace, warn};

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/ws/realtime", get(upgrade_handler))
}

async fn upgrade_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    // ---
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    // ---
    let (mut sender, mut receiver) = socket.split();
    let (subscriber_id, mut rx) = state.hub.subscribe().await;

    info!(
        subscriber_id = %subscriber_id,
        subscriber_count = state.hub.subscriber_count(),
        "WebSocket client connected"
    );

    // Forward hub events to the client until either side goes away
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain client frames; content is keepalive only and is ignored
    let sid = subscriber_id;
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    info!(subscriber_id = %sid, "WebSocket client sent close");
                    break;
                }
                Ok(frame) => {
                    trace!(subscriber_id = %sid, "Ignoring client frame: {:?}", frame);
                }
                Err(e) => {
                    warn!(subscriber_id = %sid, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unsubscribe(&subscriber_id).await;
    info!(
        subscriber_id = %subscriber_id,
        subscriber_count = state.hub.subscriber_count(),
        "WebSocket client disconnected"
    );
}
