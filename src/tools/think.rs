//! Scratchpad tool: records a thought without side effects.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde_json::Value;
use tracing::debug;

use crate::protocol::types::{ToolParameter, ToolSchema};
use crate::tools::ToolExecutor;
use crate::{AppError, Result};

/// Lets the agent log intermediate reasoning as a no-op tool call.
pub struct ThinkTool;

impl ToolExecutor for ThinkTool {
    fn name(&self) -> &'static str {
        "think"
    }

    fn description(&self) -> &'static str {
        "Record a thought; has no side effects"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object(
            [(
                "thought".to_owned(),
                ToolParameter {
                    description: "The thought to record".into(),
                    param_type: "string".into(),
                    default: None,
                    allowed_values: None,
                },
            )],
            ["thought".to_owned()],
        )
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute<'a>(
        &'a self,
        arguments: Value,
        _working_directory: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let thought = arguments
                .get("thought")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AppError::InvalidParams("think requires a string 'thought' argument".into())
                })?;

            debug!(chars = thought.len(), "thought recorded");
            Ok("Thought recorded.".to_owned())
        })
    }
}
