//! JSON-RPC 2.0 envelope types and wire error codes.
//!
//! An envelope is one of three shapes: a [`Request`] (carries a
//! correlation id), a [`Notification`] (structurally identical minus the
//! id), or a [`Response`] (id plus exactly one of `result` or `error`).
//! The `jsonrpc` version tag is fixed at `"2.0"` and checked while the
//! envelope is classified, before any dispatch happens.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::AppError;

/// Fixed JSON-RPC version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Wire-stable error codes: the reserved JSON-RPC band plus the ACP band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Frame was not valid JSON.
    ParseError,
    /// Envelope violated the JSON-RPC structure.
    InvalidRequest,
    /// Method name is not in the dispatch table.
    MethodNotFound,
    /// Parameters failed validation.
    InvalidParams,
    /// Unexpected failure inside a handler.
    InternalError,
    /// Agent runtime failure.
    AgentError,
    /// Tool resolution or invocation failure.
    ToolError,
    /// Caller lacks permission for the operation.
    PermissionDenied,
    /// Session id is unknown or inactive.
    SessionNotFound,
    /// Session exceeded its inactivity timeout.
    SessionExpired,
    /// Operation is not supported by this gateway.
    UnsupportedOperation,
}

impl ErrorCode {
    /// Integer wire representation.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::AgentError => -32000,
            Self::ToolError => -32001,
            Self::PermissionDenied => -32002,
            Self::SessionNotFound => -32003,
            Self::SessionExpired => -32004,
            Self::UnsupportedOperation => -32005,
        }
    }

    /// Map a domain error to its wire code.
    ///
    /// Admission failures (`Capacity`, `DuplicateSession`) surface as
    /// internal errors, matching the `session/new` failure envelope of the
    /// wire contract; everything without a dedicated band does the same.
    #[must_use]
    pub fn from_app_error(err: &AppError) -> Self {
        match err {
            AppError::Rpc(_) => Self::InvalidRequest,
            AppError::InvalidParams(_) => Self::InvalidParams,
            AppError::Agent(_) => Self::AgentError,
            AppError::Tool(_) | AppError::ToolNotFound(_) => Self::ToolError,
            AppError::PermissionDenied(_) => Self::PermissionDenied,
            AppError::SessionNotFound(_) => Self::SessionNotFound,
            AppError::SessionExpired(_) => Self::SessionExpired,
            AppError::Unsupported(_) => Self::UnsupportedOperation,
            AppError::Codec(_) => Self::ParseError,
            AppError::Config(_)
            | AppError::Capacity(_)
            | AppError::DuplicateSession(_)
            | AppError::Timeout(_)
            | AppError::Io(_)
            | AppError::Internal(_) => Self::InternalError,
        }
    }
}

/// Correlation id: string or integer, per JSON-RPC 2.0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer id (the gateway's own client role always uses these).
    Number(u64),
    /// String id.
    Text(String),
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// JSON-RPC error object carried inside an error [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Integer error code (see [`ErrorCode`]).
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Build an error object from a wire code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Build an error object from a domain error.
    #[must_use]
    pub fn from_app_error(err: &AppError) -> Self {
        Self::new(ErrorCode::from_app_error(err), err.to_string())
    }
}

/// Inbound request: method, optional object params, correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Correlation id echoed on the response.
    pub id: RequestId,
    /// Method name.
    pub method: String,
    /// Parameters; handlers receive an empty object when absent.
    pub params: Option<Map<String, Value>>,
}

impl Request {
    /// Parameters as a `Value`, substituting an empty object when absent.
    #[must_use]
    pub fn params_value(&self) -> Value {
        self.params
            .clone()
            .map_or_else(|| json!({}), Value::Object)
    }
}

/// Inbound notification: a request without a correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Method name.
    pub method: String,
    /// Parameters; handlers receive an empty object when absent.
    pub params: Option<Map<String, Value>>,
}

impl Notification {
    /// Parameters as a `Value`, substituting an empty object when absent.
    #[must_use]
    pub fn params_value(&self) -> Value {
        self.params
            .clone()
            .map_or_else(|| json!({}), Value::Object)
    }
}

/// Response envelope: id plus exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Correlation id; `None` when the request id could not be recovered
    /// (parse-level failures respond with a null id).
    pub id: Option<RequestId>,
    /// Success payload.
    pub result: Option<Value>,
    /// Failure payload.
    pub error: Option<RpcError>,
}

impl Response {
    /// Successful response keyed to `id`.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error response keyed to `id` (or null for parse-level failures).
    #[must_use]
    pub fn failure(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Serialize to one wire frame (no trailing newline).
    ///
    /// Serialization of these envelopes cannot fail in practice; should it
    /// ever, a hand-built internal-error frame is emitted instead so the
    /// client always receives a correctly shaped response.
    #[must_use]
    pub fn to_frame(&self) -> String {
        let mut body = Map::new();
        body.insert("jsonrpc".into(), json!(JSONRPC_VERSION));
        match &self.id {
            Some(id) => {
                body.insert("id".into(), serde_json::to_value(id).unwrap_or(Value::Null));
            }
            None => {
                body.insert("id".into(), Value::Null);
            }
        }
        if let Some(result) = &self.result {
            body.insert("result".into(), result.clone());
        }
        if let Some(error) = &self.error {
            match serde_json::to_value(error) {
                Ok(v) => {
                    body.insert("error".into(), v);
                }
                Err(_) => {
                    return format!(
                        "{{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{{\"code\":{},\"message\":\"internal error\"}}}}",
                        ErrorCode::InternalError.code()
                    );
                }
            }
        }
        Value::Object(body).to_string()
    }
}

/// Tagged union of the three envelope shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Method call expecting a response.
    Request(Request),
    /// Method call expecting no response.
    Notification(Notification),
    /// Reply to an earlier request.
    Response(Response),
}

/// Envelope classification failure, carrying enough context to answer
/// (or deliberately not answer) the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The frame was not a JSON object at all.
    Parse(String),
    /// An id-bearing envelope violated the structure; answer with
    /// invalid-request keyed to this id (null when the id itself was
    /// not a string or integer).
    InvalidRequest {
        /// Recovered correlation id, if representable.
        id: Option<RequestId>,
        /// Violation description.
        message: String,
    },
    /// An id-less envelope violated the structure; there is no response
    /// channel, so the frame is dropped with a logged warning.
    InvalidNotification(String),
}

/// Classify a parsed JSON value into an [`Envelope`].
///
/// Classification happens by `id` presence first; structural checks
/// (version tag, method, object params) follow so that violations are
/// answered on the correct channel.
///
/// # Errors
///
/// Returns [`EnvelopeError::Parse`] for non-objects,
/// [`EnvelopeError::InvalidRequest`] for id-bearing structural
/// violations, and [`EnvelopeError::InvalidNotification`] for id-less
/// ones.
pub fn classify(value: &Value) -> Result<Envelope, EnvelopeError> {
    let Some(obj) = value.as_object() else {
        return Err(EnvelopeError::Parse("message must be a JSON object".into()));
    };

    let has_id = obj.contains_key("id");
    let id = obj.get("id").and_then(parse_id);
    let has_method = obj.contains_key("method");

    // A method-less, id-bearing envelope with result/error is a Response.
    if !has_method && id.is_some() && (obj.contains_key("result") || obj.contains_key("error")) {
        let error = obj
            .get("error")
            .and_then(|e| serde_json::from_value::<RpcError>(e.clone()).ok());
        return Ok(Envelope::Response(Response {
            id,
            result: obj.get("result").cloned(),
            error,
        }));
    }

    // An `id` key of the wrong type (null, float, array) still marks the
    // envelope as a request; the response is keyed to a null id.
    if has_id && id.is_none() {
        return Err(EnvelopeError::InvalidRequest {
            id: None,
            message: "id must be a string or integer".into(),
        });
    }

    if let Some(message) = envelope_violation(obj) {
        return match id {
            Some(id) => Err(EnvelopeError::InvalidRequest {
                id: Some(id),
                message,
            }),
            None => Err(EnvelopeError::InvalidNotification(message)),
        };
    }

    // Structure is valid from here: version tag present, method present,
    // params absent or an object.
    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let params = obj.get("params").and_then(Value::as_object).cloned();

    match id {
        Some(id) => Ok(Envelope::Request(Request { id, method, params })),
        None => Ok(Envelope::Notification(Notification { method, params })),
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Recover a correlation id from a raw `id` field.
fn parse_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(s) => Some(RequestId::Text(s.clone())),
        Value::Number(n) => n.as_u64().map(RequestId::Number),
        _ => None,
    }
}

/// Describe the first structural violation in `obj`, if any.
fn envelope_violation(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => return Some(format!("unsupported jsonrpc version '{other}'")),
        None => return Some("missing jsonrpc version tag".into()),
    }

    match obj.get("method") {
        Some(Value::String(m)) if !m.is_empty() => {}
        Some(_) => return Some("method must be a non-empty string".into()),
        None => return Some("missing method".into()),
    }

    if let Some(params) = obj.get("params") {
        if !params.is_object() && !params.is_null() {
            return Some("params must be an object or null".into());
        }
    }

    None
}
