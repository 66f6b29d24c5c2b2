//! Session record and the modes a session can run in.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Operating mode governing what the agent may do within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Full tool access; commands and file writes execute.
    Execute,
    /// Agent reasons and proposes but tool calls are not executed.
    Plan,
    /// Read-only tools permitted; mutating tools are denied.
    Safe,
}

impl SessionMode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Plan => "plan",
            Self::Safe => "safe",
        }
    }

    /// Parse a wire mode name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "execute" => Some(Self::Execute),
            "plan" => Some(Self::Plan),
            "safe" => Some(Self::Safe),
            _ => None,
        }
    }
}

/// One live editor↔agent conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque unique id handed to the client by `session/new`.
    pub id: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant of the most recent operation touching this session.
    pub last_activity: DateTime<Utc>,
    /// Directory tool calls resolve relative paths against.
    pub working_directory: PathBuf,
    /// Model serving this session's prompts.
    pub model: String,
    /// Current operating mode.
    pub mode: SessionMode,
    /// Opaque client-supplied annotations from `session/new`.
    pub metadata: Value,
    /// Cleared by `session/cancel`; inactive sessions refuse prompts.
    pub active: bool,
    /// Number of prompts processed so far.
    pub message_count: u64,
    /// Number of tool invocations scoped to this session.
    pub tool_call_count: u64,
}

impl Session {
    /// Create a fresh session with a random id, stamped at `now`.
    #[must_use]
    pub fn new(
        working_directory: PathBuf,
        model: String,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_activity: now,
            working_directory,
            model,
            mode: SessionMode::Execute,
            metadata,
            active: true,
            message_count: 0,
            tool_call_count: 0,
        }
    }

    /// Whether the session has been idle past `timeout` as of `now`.
    #[must_use]
    pub fn is_expired(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > timeout
    }

    /// Wire representation used in method results.
    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "session_id": self.id,
            "created_at": self.created_at.to_rfc3339(),
            "last_activity": self.last_activity.to_rfc3339(),
            "working_directory": self.working_directory.display().to_string(),
            "model": self.model,
            "mode": self.mode.as_str(),
            "metadata": self.metadata,
            "active": self.active,
            "message_count": self.message_count,
            "tool_call_count": self.tool_call_count,
        })
    }
}
