//! Agent runtime boundary.
//!
//! The gateway does not embed a model; it drives whatever implements
//! [`AgentRuntime`]. The runtime receives the session snapshot, the
//! prompt text, a streaming notifier, and the tool registry, and it is
//! expected to honor the cancellation token between steps.

pub mod loopback;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::protocol::notifier::StreamingNotifier;
use crate::protocol::types::StopReason;
use crate::session::Session;
use crate::tools::ToolRegistry;
use crate::Result;

pub use loopback::LoopbackRuntime;

/// Final outcome of one prompt turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTurn {
    /// Final assistant message for the turn.
    pub message: String,
    /// Why the turn stopped.
    pub stop_reason: StopReason,
}

impl AgentTurn {
    /// A turn that ran to completion with the given message.
    #[must_use]
    pub fn completion(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stop_reason: StopReason::Completion,
        }
    }

    /// A turn interrupted by cancellation.
    #[must_use]
    pub fn user_stop() -> Self {
        Self {
            message: String::new(),
            stop_reason: StopReason::UserStop,
        }
    }
}

/// Something that can process one prompt turn for a session.
pub trait AgentRuntime: Send + Sync {
    /// Prepare execution state for a freshly created session.
    ///
    /// Called once by `session/new`. The default implementation keeps no
    /// per-session state and succeeds immediately.
    fn create_context<'a>(
        &'a self,
        session: &'a Session,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let _ = session;
        Box::pin(async { Ok(()) })
    }

    /// Drive one turn to completion, streaming progress through
    /// `notifier` and checking `cancel` between steps.
    fn run_turn<'a>(
        &'a self,
        session: &'a Session,
        prompt: &'a str,
        notifier: &'a StreamingNotifier,
        tools: &'a ToolRegistry,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AgentTurn>> + Send + 'a>>;
}
