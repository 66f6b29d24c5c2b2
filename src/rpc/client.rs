//! Outbound JSON-RPC client role: id allocation and response correlation.
//!
//! The gateway occasionally calls back into its peer (permission
//! prompts, file-system requests). [`RpcClient`] allocates monotonic
//! integer ids, parks each caller on a oneshot until the matching
//! response frame arrives, and enforces a per-request deadline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use crate::rpc::envelope::{RpcError, JSONRPC_VERSION};
use crate::rpc::FrameSink;
use crate::{AppError, Result};

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, RpcError>>>>;

/// Client role over one outbound frame sink.
///
/// Clone-cheap: all state is behind `Arc`s so the transport read loop
/// can feed [`handle_frame`](RpcClient::handle_frame) while callers
/// block in [`request`](RpcClient::request).
#[derive(Clone)]
pub struct RpcClient {
    sink: FrameSink,
    next_id: Arc<AtomicU64>,
    pending: Arc<PendingMap>,
    notifications: mpsc::Sender<(String, Value)>,
    timeout: Duration,
}

impl RpcClient {
    /// Create a client over `sink` with the given request deadline.
    ///
    /// Peer-initiated notifications observed by
    /// [`handle_frame`](RpcClient::handle_frame) are forwarded to the
    /// returned receiver.
    #[must_use]
    pub fn new(sink: FrameSink, timeout: Duration) -> (Self, mpsc::Receiver<(String, Value)>) {
        let (notif_tx, notif_rx) = mpsc::channel(64);
        (
            Self {
                sink,
                next_id: Arc::new(AtomicU64::new(1)),
                pending: Arc::new(Mutex::new(HashMap::new())),
                notifications: notif_tx,
                timeout,
            },
            notif_rx,
        )
    }

    /// Send a request and wait for the correlated response.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` when the deadline elapses (the pending
    /// entry is removed so a late response is dropped, not leaked),
    /// `AppError::Io` when the sink is closed, and `AppError::Rpc`
    /// carrying the peer's error when the response is a failure.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": method,
            "params": params,
        })
        .to_string();

        if self.sink.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(AppError::Io("outbound channel closed".into()));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(rpc_err))) => Err(AppError::Rpc(format!(
                "peer error {}: {}",
                rpc_err.code, rpc_err.message
            ))),
            Ok(Err(_)) => Err(AppError::Internal(
                "response channel dropped before resolution".into(),
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(AppError::Timeout(format!(
                    "request '{method}' (id {id}) timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    /// Send a fire-and-forget notification.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the sink is closed.
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let frame = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": method,
            "params": params,
        })
        .to_string();

        self.sink
            .send(frame)
            .await
            .map_err(|_| AppError::Io("outbound channel closed".into()))
    }

    /// Feed one inbound frame from the peer.
    ///
    /// Resolves the pending request matching the frame's id, forwards
    /// bare notifications to the observer channel, and drops everything
    /// else with a log line. Returns `true` when the frame was consumed
    /// (correlated or forwarded).
    pub async fn handle_frame(&self, value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };

        // Notification from the peer: no id, has a method.
        if !obj.contains_key("id") {
            if let Some(method) = obj.get("method").and_then(Value::as_str) {
                let params = obj.get("params").cloned().unwrap_or_else(|| json!({}));
                if self
                    .notifications
                    .send((method.to_owned(), params))
                    .await
                    .is_err()
                {
                    debug!(method, "rpc client: notification observer closed");
                }
                return true;
            }
            return false;
        }

        // Response frames carry result or error, never a method.
        if obj.contains_key("method") {
            return false;
        }

        let Some(id) = obj.get("id").and_then(Value::as_u64) else {
            warn!("rpc client: response with non-integer id, dropping");
            return true;
        };

        let Some(tx) = self.pending.lock().await.remove(&id) else {
            warn!(id, "rpc client: response for unknown request id, dropping");
            return true;
        };

        let outcome = if let Some(error) = obj.get("error") {
            match serde_json::from_value::<RpcError>(error.clone()) {
                Ok(e) => Err(e),
                Err(_) => Err(RpcError {
                    code: -32603,
                    message: "malformed error object in response".into(),
                    data: None,
                }),
            }
        } else {
            Ok(obj.get("result").cloned().unwrap_or(Value::Null))
        };

        if tx.send(outcome).is_err() {
            debug!(id, "rpc client: caller gave up before response arrived");
        }
        true
    }

    /// Number of requests still awaiting responses.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
