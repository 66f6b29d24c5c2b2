//! Streaming `session/update` notifications.
//!
//! One notifier serves one prompt turn: every update it emits is tagged
//! with the owning session id and flows through the connection's frame
//! sink, interleaving with responses written by the engine.

use serde_json::{json, Value};
use tracing::debug;

use crate::protocol::types::{ContentItem, StopReason};
use crate::rpc::envelope::JSONRPC_VERSION;
use crate::rpc::FrameSink;
use crate::{AppError, Result};

/// Emitter of `session/update` notification frames for one session.
#[derive(Clone)]
pub struct StreamingNotifier {
    sink: FrameSink,
    session_id: String,
}

impl StreamingNotifier {
    /// Bind a notifier to a session and the connection's outbound sink.
    #[must_use]
    pub fn new(sink: FrameSink, session_id: impl Into<String>) -> Self {
        Self {
            sink,
            session_id: session_id.into(),
        }
    }

    /// Session this notifier is tagged with.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stream an assistant message chunk.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn message(&self, text: impl Into<String>) -> Result<()> {
        self.send(json!({
            "type": "message",
            "content": [ContentItem::text(text.into())],
        }))
        .await
    }

    /// Announce a tool invocation before it runs.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn tool_call(&self, name: &str, arguments: &Value) -> Result<()> {
        self.send(json!({
            "type": "tool_call",
            "tool_name": name,
            "arguments": arguments,
        }))
        .await
    }

    /// Report a completed tool invocation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn tool_result(&self, name: &str, output: &str, is_error: bool) -> Result<()> {
        self.send(json!({
            "type": "tool_result",
            "tool_name": name,
            "content": [ContentItem::text(output)],
            "is_error": is_error,
        }))
        .await
    }

    /// Report a mid-turn failure.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn error(&self, message: &str) -> Result<()> {
        self.send(json!({
            "type": "error",
            "message": message,
        }))
        .await
    }

    /// Mark the turn complete.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn complete(&self, stop_reason: StopReason) -> Result<()> {
        self.send(json!({
            "type": "complete",
            "stop_reason": stop_reason,
        }))
        .await
    }

    /// Mark the turn cancelled.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the connection sink is closed.
    pub async fn cancelled(&self) -> Result<()> {
        self.send(json!({ "type": "cancelled" })).await
    }

    /// Wrap `update` in a `session/update` notification and enqueue one
    /// frame.
    async fn send(&self, update: Value) -> Result<()> {
        let frame = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": "session/update",
            "params": {
                "session_id": self.session_id,
                "update": update,
            },
        })
        .to_string();

        debug!(session_id = %self.session_id, "streaming session update");
        self.sink
            .send(frame)
            .await
            .map_err(|_| AppError::Io("outbound channel closed".into()))
    }
}
