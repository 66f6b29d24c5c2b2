//! The ACP method surface: the fixed method set and its handlers.
//!
//! Dispatch is an exhaustive match over [`Method`], so adding a method
//! without a handler is a compile error rather than a silent
//! method-not-found at runtime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::AgentRuntime;
use crate::config::GatewayConfig;
use crate::protocol::notifier::StreamingNotifier;
use crate::protocol::types::{
    AgentCapabilities, ContentItem, InitializeParams, StopReason, ToolCallResult,
    PROTOCOL_VERSION,
};
use crate::rpc::FrameSink;
use crate::session::{SessionManager, SessionMode};
use crate::tools::ToolRegistry;
use crate::{AppError, Result};

/// Every method this gateway serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Capability negotiation.
    Initialize,
    /// Create a session.
    SessionNew,
    /// Run one prompt turn.
    SessionPrompt,
    /// Switch a session's operating mode.
    SessionSetMode,
    /// Switch a session's model.
    SessionSetModel,
    /// Interrupt an in-flight prompt turn.
    SessionCancel,
    /// List available tools.
    ToolsList,
    /// Invoke a tool directly.
    ToolsCall,
}

impl Method {
    /// All methods, in wire-documentation order.
    pub const ALL: [Self; 8] = [
        Self::Initialize,
        Self::SessionNew,
        Self::SessionPrompt,
        Self::SessionSetMode,
        Self::SessionSetModel,
        Self::SessionCancel,
        Self::ToolsList,
        Self::ToolsCall,
    ];

    /// Wire name of the method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::SessionNew => "session/new",
            Self::SessionPrompt => "session/prompt",
            Self::SessionSetMode => "session/set_mode",
            Self::SessionSetModel => "session/set_model",
            Self::SessionCancel => "session/cancel",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
        }
    }

    /// Resolve a wire method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// Per-connection state handed to every handler.
#[derive(Clone)]
pub struct ConnectionContext {
    sink: FrameSink,
}

impl ConnectionContext {
    /// Bind a context to the connection's outbound frame sink.
    #[must_use]
    pub fn new(sink: FrameSink) -> Self {
        Self { sink }
    }

    /// Notifier emitting `session/update` frames on this connection.
    #[must_use]
    pub fn notifier(&self, session_id: &str) -> StreamingNotifier {
        StreamingNotifier::new(self.sink.clone(), session_id)
    }
}

// ── Parameter shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SessionNewParams {
    #[serde(default)]
    working_directory: Option<PathBuf>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Prompt content: either a bare string or a list of content blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptInput {
    Text(String),
    Items(Vec<ContentItem>),
}

impl PromptInput {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Items(items) => items
                .iter()
                .filter_map(ContentItem::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionPromptParams {
    session_id: String,
    prompt: PromptInput,
    /// Mode override applied to the session before the turn runs.
    #[serde(default)]
    mode: Option<String>,
    /// Model override applied to the session before the turn runs.
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionSetModeParams {
    session_id: String,
    mode: String,
}

#[derive(Debug, Deserialize)]
struct SessionSetModelParams {
    session_id: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct SessionCancelParams {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    #[serde(default)]
    session_id: Option<String>,
    name: String,
    #[serde(default = "empty_object")]
    arguments: Value,
}

fn empty_object() -> Value {
    json!({})
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| AppError::InvalidParams(e.to_string()))
}

// ── Handler table ─────────────────────────────────────────────────────────────

/// Shared handler state behind the method surface.
pub struct GatewayMethods {
    config: Arc<GatewayConfig>,
    sessions: Arc<SessionManager>,
    tools: Arc<ToolRegistry>,
    runtime: Arc<dyn AgentRuntime>,
    active_turns: Mutex<HashMap<String, CancellationToken>>,
}

impl GatewayMethods {
    /// Assemble the method surface over its collaborators.
    #[must_use]
    pub fn new(
        config: Arc<GatewayConfig>,
        sessions: Arc<SessionManager>,
        tools: Arc<ToolRegistry>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        Self {
            config,
            sessions,
            tools,
            runtime,
            active_turns: Mutex::new(HashMap::new()),
        }
    }

    /// Session registry backing this surface.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Route one request to its handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's domain error; the engine maps it onto
    /// the wire error bands.
    pub async fn dispatch(
        &self,
        method: Method,
        params: Value,
        ctx: &ConnectionContext,
    ) -> Result<Value> {
        match method {
            Method::Initialize => self.initialize(params),
            Method::SessionNew => self.session_new(params).await,
            Method::SessionPrompt => self.session_prompt(params, ctx).await,
            Method::SessionSetMode => self.session_set_mode(params).await,
            Method::SessionSetModel => self.session_set_model(params).await,
            Method::SessionCancel => self.session_cancel(params).await,
            Method::ToolsList => Ok(self.tools_list()),
            Method::ToolsCall => self.tools_call(params).await,
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    /// `initialize`: negotiate capabilities. Idempotent; a version
    /// mismatch is logged, not rejected.
    fn initialize(&self, params: Value) -> Result<Value> {
        let params: InitializeParams = parse_params(params)?;

        if let Some(info) = &params.client_info {
            info!(client = %info.name, version = %info.version, "client initialized");
        }
        if let Some(version) = &params.protocol_version {
            if version != PROTOCOL_VERSION {
                warn!(
                    client_version = %version,
                    server_version = PROTOCOL_VERSION,
                    "protocol version mismatch"
                );
            }
        }

        let native = AgentCapabilities::native();
        let capabilities = match &params.capabilities {
            Some(client) => native.intersect(client),
            None => native,
        };

        Ok(json!({
            "protocol_version": PROTOCOL_VERSION,
            "server_info": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": capabilities,
        }))
    }

    /// `session/new`: admit a session and prime the runtime for it.
    async fn session_new(&self, params: Value) -> Result<Value> {
        let params: SessionNewParams = parse_params(params)?;

        let model = match params.model {
            Some(model) => {
                self.ensure_known_model(&model)?;
                model
            }
            None => self.config.default_model.clone(),
        };
        let working_directory = params
            .working_directory
            .unwrap_or_else(|| self.config.working_directory.clone());
        let metadata = params.metadata.unwrap_or_else(empty_object);

        let session = self
            .sessions
            .create(working_directory, model, metadata)
            .await?;
        self.runtime.create_context(&session).await?;
        Ok(json!({
            "session_id": session.id,
            "model": session.model,
            "mode": session.mode.as_str(),
            "working_directory": session.working_directory.display().to_string(),
            "available_models": self.config.available_models,
        }))
    }

    /// `session/prompt`: run one turn, streaming updates along the way.
    ///
    /// Mode and model overrides in the call update the session before
    /// the turn is driven.
    async fn session_prompt(&self, params: Value, ctx: &ConnectionContext) -> Result<Value> {
        let params: SessionPromptParams = parse_params(params)?;

        if let Some(mode) = &params.mode {
            let mode = SessionMode::from_name(mode)
                .ok_or_else(|| AppError::InvalidParams(format!("unknown mode '{mode}'")))?;
            self.sessions.set_mode(&params.session_id, mode).await?;
        }
        if let Some(model) = &params.model {
            self.ensure_known_model(model)?;
            self.sessions
                .set_model(&params.session_id, model.clone())
                .await?;
        }

        let session = self.sessions.record_prompt(&params.session_id).await?;
        let prompt = params.prompt.into_text();

        let notifier = ctx.notifier(&session.id);
        let cancel = CancellationToken::new();
        self.active_turns
            .lock()
            .await
            .insert(session.id.clone(), cancel.clone());

        let outcome = self
            .runtime
            .run_turn(&session, &prompt, &notifier, &self.tools, cancel)
            .await;

        self.active_turns.lock().await.remove(&session.id);

        match outcome {
            Ok(turn) => {
                if turn.stop_reason == StopReason::Completion {
                    notifier.complete(turn.stop_reason).await?;
                }
                Ok(json!({
                    "message": turn.message,
                    "stop_reason": turn.stop_reason,
                }))
            }
            Err(e) => {
                // Best effort: the request still fails with the same error.
                if let Err(notify_err) = notifier.error(&e.to_string()).await {
                    warn!(error = %notify_err, "failed to stream turn error");
                }
                Err(e)
            }
        }
    }

    /// `session/set_mode`: switch operating mode.
    async fn session_set_mode(&self, params: Value) -> Result<Value> {
        let params: SessionSetModeParams = parse_params(params)?;
        let mode = SessionMode::from_name(&params.mode).ok_or_else(|| {
            AppError::InvalidParams(format!("unknown mode '{}'", params.mode))
        })?;

        let session = self.sessions.set_mode(&params.session_id, mode).await?;
        info!(session_id = %session.id, mode = mode.as_str(), "session mode changed");
        Ok(json!({
            "session_id": session.id,
            "mode": session.mode.as_str(),
        }))
    }

    /// `session/set_model`: switch serving model.
    async fn session_set_model(&self, params: Value) -> Result<Value> {
        let params: SessionSetModelParams = parse_params(params)?;
        self.ensure_known_model(&params.model)?;

        let session = self
            .sessions
            .set_model(&params.session_id, params.model)
            .await?;
        info!(session_id = %session.id, model = %session.model, "session model changed");
        Ok(json!({
            "session_id": session.id,
            "model": session.model,
        }))
    }

    /// `session/cancel`: mark the session inactive and interrupt its
    /// in-flight turn, if any. Best effort: a running tool call is not
    /// rolled back.
    async fn session_cancel(&self, params: Value) -> Result<Value> {
        let params: SessionCancelParams = parse_params(params)?;
        let session = self.sessions.deactivate(&params.session_id).await?;

        let cancelled = match self.active_turns.lock().await.get(&session.id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };

        info!(session_id = %session.id, cancelled, "cancel requested");
        Ok(json!({
            "session_id": session.id,
            "active": false,
            "cancelled": cancelled,
        }))
    }

    /// `tools/list`: advertise the registry.
    fn tools_list(&self) -> Value {
        json!({ "tools": self.tools.descriptors() })
    }

    /// `tools/call`: invoke a tool directly, honoring session mode.
    async fn tools_call(&self, params: Value) -> Result<Value> {
        let params: ToolsCallParams = parse_params(params)?;

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| AppError::ToolNotFound(params.name.clone()))?;

        let working_directory = match &params.session_id {
            Some(id) => {
                let session = self.sessions.get(id).await?;
                match session.mode {
                    SessionMode::Plan => {
                        return Err(AppError::PermissionDenied(
                            "tool execution is disabled in plan mode".into(),
                        ));
                    }
                    SessionMode::Safe if !tool.read_only() => {
                        return Err(AppError::PermissionDenied(format!(
                            "tool '{}' is not permitted in safe mode",
                            params.name
                        )));
                    }
                    _ => {}
                }
                session.working_directory
            }
            None => self.config.working_directory.clone(),
        };

        let outcome = self
            .tools
            .execute(&params.name, params.arguments, &working_directory)
            .await?;

        if let Some(id) = &params.session_id {
            // Count the call even if the session lapsed mid-invocation.
            if let Err(e) = self.sessions.record_tool_call(id).await {
                warn!(session_id = %id, error = %e, "tool call not recorded");
            }
        }

        let result = ToolCallResult {
            content: vec![ContentItem::text(outcome.output)],
            is_error: outcome.is_error,
        };
        serde_json::to_value(result).map_err(|e| AppError::Internal(e.to_string()))
    }

    fn ensure_known_model(&self, model: &str) -> Result<()> {
        if self.config.available_models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(AppError::InvalidParams(format!(
                "model '{model}' is not available",
            )))
        }
    }
}
