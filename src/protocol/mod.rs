//! ACP protocol surface: method table, wire types, streaming updates.

pub mod methods;
pub mod notifier;
pub mod types;

pub use methods::{ConnectionContext, GatewayMethods, Method};
pub use notifier::StreamingNotifier;
pub use types::{
    AgentCapabilities, ClientInfo, ContentItem, InitializeParams, StopReason, ToolCallResult,
    ToolDescriptor, ToolParameter, ToolSchema, PROTOCOL_VERSION,
};
