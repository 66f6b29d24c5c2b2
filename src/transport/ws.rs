//! WebSocket transport: NDJSON frames over `/ws`, plus info and health
//! endpoints.
//!
//! Each connection gets its own engine and frame decoder, so framing
//! state and in-flight turns never leak between clients. A single
//! writer task per connection owns the socket's send half.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{GatewayMethods, PROTOCOL_VERSION};
use crate::rpc::codec::FrameDecoder;
use crate::rpc::RpcEngine;
use crate::{AppError, Result};

/// Build the HTTP router: `/` (service info), `/health`, `/ws`.
#[must_use]
pub fn router(methods: Arc<GatewayMethods>) -> Router {
    Router::new()
        .route("/", get(|| async { service_info() }))
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade))
        .with_state(methods)
}

/// Serve the WebSocket transport until shutdown.
///
/// # Errors
///
/// Returns `AppError::Config` when the bind address is unavailable and
/// `AppError::Io` when the server loop fails.
pub async fn run_ws(
    methods: Arc<GatewayMethods>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind websocket on {bind}: {err}")))?;

    info!(%bind, "websocket transport started");

    axum::serve(listener, router(methods))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Io(format!("websocket server failed: {err}")))
}

// ── Routes ────────────────────────────────────────────────────────────────────

fn service_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "protocol_version": PROTOCOL_VERSION,
        "endpoints": { "websocket": "/ws", "health": "/health" },
    }))
}

async fn health(State(methods): State<Arc<GatewayMethods>>) -> impl IntoResponse {
    let stats = methods.sessions().stats().await;
    Json(json!({
        "status": "ok",
        "sessions": stats.total_sessions,
        "max_sessions": stats.max_sessions,
    }))
}

#[allow(clippy::unused_async)] // axum handlers must be async
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(methods): State<Arc<GatewayMethods>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, methods))
}

// ── Connection loop ───────────────────────────────────────────────────────────

async fn handle_socket(socket: WebSocket, methods: Arc<GatewayMethods>) {
    debug!("websocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (sink_tx, mut sink_rx) = mpsc::channel::<String>(256);
    let engine = RpcEngine::new(methods, sink_tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(frame) = sink_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                debug!("websocket send half closed");
                break;
            }
        }
    });

    let mut decoder = FrameDecoder::new();
    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                warn!(error = %err, "websocket receive error, closing");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                // A text message carries one or more NDJSON lines; the
                // message boundary terminates the final line.
                let mut chunk = text.to_string();
                if !chunk.ends_with('\n') {
                    chunk.push('\n');
                }

                for frame in decoder.feed(&chunk) {
                    if let Some(response) = engine.process(&frame.raw).await {
                        if sink_tx.send(response).await.is_err() {
                            warn!("websocket writer stopped, closing");
                            drop(engine);
                            drop(sink_tx);
                            let _ = writer.await;
                            return;
                        }
                    }
                }
            }
            Message::Binary(_) => {
                warn!("binary frames are not supported, dropping");
            }
            Message::Close(_) => {
                debug!("websocket client sent close");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    drop(engine);
    drop(sink_tx);
    let _ = writer.await;
    debug!("websocket client disconnected");
}
