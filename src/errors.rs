//! Error types shared across the gateway.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// NDJSON framing failure (oversized or unterminated line).
    Codec(String),
    /// JSON-RPC envelope violation (bad version tag, missing method).
    Rpc(String),
    /// Request or notification parameters failed validation.
    InvalidParams(String),
    /// Agent runtime failure while driving a turn.
    Agent(String),
    /// Tool invocation failure.
    Tool(String),
    /// Requested tool is not registered with the gateway.
    ToolNotFound(String),
    /// Requested session does not exist or is no longer active.
    SessionNotFound(String),
    /// Session exceeded the inactivity timeout.
    SessionExpired(String),
    /// Admission control rejected a new session.
    Capacity(String),
    /// Session id collision on create.
    DuplicateSession(String),
    /// Caller is not authorized to perform the requested action.
    PermissionDenied(String),
    /// Operation is valid ACP but not supported by this gateway.
    Unsupported(String),
    /// Outbound request deadline elapsed before a response arrived.
    Timeout(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Unexpected internal failure.
    Internal(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Codec(msg) => write!(f, "codec: {msg}"),
            Self::Rpc(msg) => write!(f, "rpc: {msg}"),
            Self::InvalidParams(msg) => write!(f, "invalid params: {msg}"),
            Self::Agent(msg) => write!(f, "agent: {msg}"),
            Self::Tool(msg) => write!(f, "tool: {msg}"),
            Self::ToolNotFound(msg) => write!(f, "tool not found: {msg}"),
            Self::SessionNotFound(msg) => write!(f, "session not found: {msg}"),
            Self::SessionExpired(msg) => write!(f, "session expired: {msg}"),
            Self::Capacity(msg) => write!(f, "capacity: {msg}"),
            Self::DuplicateSession(msg) => write!(f, "duplicate session: {msg}"),
            Self::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported operation: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Internal(msg) => write!(f, "internal: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
