//! Inbound JSON-RPC processing: decode, classify, dispatch, respond.
//!
//! One [`RpcEngine`] serves one transport connection. Requests are
//! dispatched through the fixed ACP [`Method`](crate::protocol::Method)
//! table; notifications go through a separate name→handler registry.
//! Every failure is converted into a correctly shaped error response (or
//! silence, on the notification path); nothing propagates past the
//! per-request dispatch boundary.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::protocol::methods::{ConnectionContext, GatewayMethods};
use crate::protocol::Method;
use crate::rpc::envelope::{classify, Envelope, EnvelopeError, ErrorCode, Response, RpcError};
use crate::rpc::FrameSink;
use crate::Result;

/// Handler invoked for a registered inbound notification method.
pub type NotificationHandler =
    Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Per-connection JSON-RPC request processor.
pub struct RpcEngine {
    methods: Arc<GatewayMethods>,
    ctx: ConnectionContext,
    notification_handlers: HashMap<String, NotificationHandler>,
}

impl RpcEngine {
    /// Create an engine bound to the shared method table and this
    /// connection's outbound frame sink.
    #[must_use]
    pub fn new(methods: Arc<GatewayMethods>, sink: FrameSink) -> Self {
        Self {
            methods,
            ctx: ConnectionContext::new(sink),
            notification_handlers: HashMap::new(),
        }
    }

    /// Register a handler for an inbound notification method.
    ///
    /// Unregistered notification methods are dropped with a warning.
    pub fn register_notification_handler(
        &mut self,
        method: impl Into<String>,
        handler: NotificationHandler,
    ) {
        self.notification_handlers.insert(method.into(), handler);
    }

    /// Process one raw inbound frame; returns the response frame, if any.
    ///
    /// Requests always produce a frame (result or error). Notifications,
    /// framing noise, and stray responses produce `None`.
    pub async fn process(&self, raw: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "rpc engine: frame is not valid JSON");
                let resp = Response::failure(
                    None,
                    RpcError::new(ErrorCode::ParseError, format!("parse error: {e}")),
                );
                return Some(resp.to_frame());
            }
        };

        match classify(&value) {
            Ok(Envelope::Request(req)) => Some(self.handle_request(req).await),
            Ok(Envelope::Notification(note)) => {
                self.handle_notification(note).await;
                None
            }
            Ok(Envelope::Response(resp)) => {
                // The server role holds no pending outbound requests on
                // this channel; the client role correlates its own frames.
                debug!(?resp.id, "rpc engine: dropping unsolicited response frame");
                None
            }
            Err(EnvelopeError::Parse(msg)) => {
                let resp =
                    Response::failure(None, RpcError::new(ErrorCode::InvalidRequest, msg));
                Some(resp.to_frame())
            }
            Err(EnvelopeError::InvalidRequest { id, message }) => {
                let resp =
                    Response::failure(id, RpcError::new(ErrorCode::InvalidRequest, message));
                Some(resp.to_frame())
            }
            Err(EnvelopeError::InvalidNotification(msg)) => {
                warn!(reason = %msg, "rpc engine: dropping malformed notification");
                None
            }
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Dispatch a request and shape the outcome into a response frame.
    async fn handle_request(&self, req: crate::rpc::envelope::Request) -> String {
        let Some(method) = Method::from_name(&req.method) else {
            debug!(method = %req.method, "rpc engine: method not found");
            let resp = Response::failure(
                Some(req.id),
                RpcError::new(
                    ErrorCode::MethodNotFound,
                    format!("Method '{}' not found", req.method),
                ),
            );
            return resp.to_frame();
        };

        match self
            .methods
            .dispatch(method, req.params_value(), &self.ctx)
            .await
        {
            Ok(result) => Response::success(req.id, result).to_frame(),
            Err(e) => {
                error!(method = %req.method, error = %e, "rpc engine: handler error");
                Response::failure(Some(req.id), RpcError::from_app_error(&e)).to_frame()
            }
        }
    }

    /// Invoke a registered notification handler; never answers.
    async fn handle_notification(&self, note: crate::rpc::envelope::Notification) {
        let Some(handler) = self.notification_handlers.get(&note.method) else {
            warn!(method = %note.method, "rpc engine: unknown notification method, dropping");
            return;
        };

        if let Err(e) = handler(note.params_value()).await {
            error!(method = %note.method, error = %e, "rpc engine: notification handler error");
        }
    }
}
