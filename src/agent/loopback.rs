//! Deterministic built-in runtime.
//!
//! Useful for wiring checks and tests: prompts echo back, and a prompt
//! prefixed with `!` routes through the `bash` tool so the whole
//! streaming and tool path is exercised without a model.

use std::future::Future;
use std::pin::Pin;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{AgentRuntime, AgentTurn};
use crate::protocol::notifier::StreamingNotifier;
use crate::session::{Session, SessionMode};
use crate::tools::ToolRegistry;
use crate::Result;

/// Echo runtime with a `!command` escape hatch into the `bash` tool.
#[derive(Debug, Default)]
pub struct LoopbackRuntime;

impl LoopbackRuntime {
    /// Create the runtime.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AgentRuntime for LoopbackRuntime {
    fn run_turn<'a>(
        &'a self,
        session: &'a Session,
        prompt: &'a str,
        notifier: &'a StreamingNotifier,
        tools: &'a ToolRegistry,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AgentTurn>> + Send + 'a>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                notifier.cancelled().await?;
                return Ok(AgentTurn::user_stop());
            }

            if let Some(command) = prompt.strip_prefix('!') {
                let command = command.trim();

                if session.mode != SessionMode::Execute {
                    let text = format!(
                        "({} mode) would run: {command}",
                        session.mode.as_str()
                    );
                    notifier.message(text.clone()).await?;
                    return Ok(AgentTurn::completion(text));
                }

                let arguments = json!({ "command": command });
                notifier.tool_call("bash", &arguments).await?;

                if cancel.is_cancelled() {
                    notifier.cancelled().await?;
                    return Ok(AgentTurn::user_stop());
                }

                let outcome = tools
                    .execute("bash", arguments, &session.working_directory)
                    .await?;
                notifier
                    .tool_result("bash", &outcome.output, outcome.is_error)
                    .await?;

                debug!(session_id = %session.id, is_error = outcome.is_error, "loopback command finished");
                return Ok(AgentTurn::completion(outcome.output));
            }

            let text = format!("Echo: {prompt}");
            notifier.message(text.clone()).await?;
            Ok(AgentTurn::completion(text))
        })
    }
}
