//! Wire types shared by the ACP method surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "0.4.0";

/// Feature capabilities negotiated during `initialize`.
///
/// The effective capability set for a connection is the intersection of
/// what the gateway offers and what the client declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// `session/update` notifications are emitted during prompts.
    #[serde(default)]
    pub streaming: bool,
    /// `tools/list` and `tools/call` are available.
    #[serde(default)]
    pub tools: bool,
    /// Multiple concurrent sessions are supported.
    #[serde(default)]
    pub sessions: bool,
    /// Operating modes the peer understands.
    #[serde(default)]
    pub modes: Vec<String>,
}

impl AgentCapabilities {
    /// Everything this gateway implements.
    #[must_use]
    pub fn native() -> Self {
        Self {
            streaming: true,
            tools: true,
            sessions: true,
            modes: vec!["execute".into(), "plan".into(), "safe".into()],
        }
    }

    /// Capabilities offered by both sides.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            streaming: self.streaming && other.streaming,
            tools: self.tools && other.tools,
            sessions: self.sessions && other.sessions,
            modes: self
                .modes
                .iter()
                .filter(|m| other.modes.contains(m))
                .cloned()
                .collect(),
        }
    }
}

/// Identity block a client sends in `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client product name.
    pub name: String,
    /// Client product version.
    #[serde(default)]
    pub version: String,
}

/// Parameters accepted by `initialize`. All fields are optional; a bare
/// `initialize` negotiates against an empty client capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InitializeParams {
    /// Protocol version the client speaks.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client identity, logged for diagnostics.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
    /// Capabilities the client declares.
    #[serde(default)]
    pub capabilities: Option<AgentCapabilities>,
}

/// One block of prompt or result content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text.
    Text {
        /// The text payload.
        text: String,
    },
    /// Inline binary content, base64-encoded.
    Image {
        /// Base64 payload.
        data: String,
        /// MIME type of the payload.
        mime_type: String,
    },
    /// Reference to an editor-side resource.
    Resource {
        /// Resource locator.
        uri: String,
        /// Inline text snapshot, when the client provides one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentItem {
    /// Convenience constructor for text blocks.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text carried by this item, when it has any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Resource { text: Some(text), .. } => Some(text),
            _ => None,
        }
    }
}

/// Why a prompt turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Turn was interrupted by `session/cancel`.
    UserStop,
    /// Runtime hit its per-turn tool invocation ceiling.
    ToolCallLimit,
    /// Turn ran to completion.
    Completion,
    /// Turn aborted on an agent failure.
    Error,
}

/// JSON-schema-shaped description of one tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Human-readable purpose of the parameter.
    pub description: String,
    /// JSON type name (`string`, `integer`, `boolean`, …).
    #[serde(rename = "type")]
    pub param_type: String,
    /// Default applied when the argument is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Closed set of accepted values, when applicable.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
}

/// Input schema of a tool: always a JSON object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Parameter name to parameter schema. `BTreeMap` keeps the wire
    /// order stable for clients that diff tool listings.
    pub properties: BTreeMap<String, ToolParameter>,
    /// Names of required parameters.
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolSchema {
    /// Build an object schema from parameter entries.
    #[must_use]
    pub fn object(
        properties: impl IntoIterator<Item = (String, ToolParameter)>,
        required: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            schema_type: "object".into(),
            properties: properties.into_iter().collect(),
            required: required.into_iter().collect(),
        }
    }
}

/// Tool entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name used in `tools/call`.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// Schema of the `arguments` object.
    pub input_schema: ToolSchema,
}

/// Result payload of `tools/call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Output content blocks.
    pub content: Vec<ContentItem>,
    /// Whether the output represents a failure.
    pub is_error: bool,
}
