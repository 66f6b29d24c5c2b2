//! Shell command tool.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::protocol::types::{ToolParameter, ToolSchema};
use crate::tools::ToolExecutor;
use crate::{AppError, Result};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a shell command in the session's working directory.
pub struct BashTool {
    timeout: Duration,
}

impl BashTool {
    /// Tool with the default 30-second command deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Tool with a custom command deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolExecutor for BashTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command in the session working directory"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object(
            [(
                "command".to_owned(),
                ToolParameter {
                    description: "Shell command to execute".into(),
                    param_type: "string".into(),
                    default: None,
                    allowed_values: None,
                },
            )],
            ["command".to_owned()],
        )
    }

    fn execute<'a>(
        &'a self,
        arguments: Value,
        working_directory: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let command = arguments
                .get("command")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AppError::InvalidParams("bash requires a string 'command' argument".into())
                })?
                .to_owned();

            debug!(command = %command, "running shell command");
            let child = Command::new("bash")
                .arg("-c")
                .arg(&command)
                .current_dir(working_directory)
                .kill_on_drop(true)
                .output();

            let output = tokio::time::timeout(self.timeout, child)
                .await
                .map_err(|_| {
                    AppError::Tool(format!(
                        "command timed out after {} seconds",
                        self.timeout.as_secs()
                    ))
                })?
                .map_err(|e| AppError::Tool(format!("failed to spawn command: {e}")))?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);

            let mut text = String::new();
            if !output.status.success() {
                let code = output.status.code().unwrap_or(-1);
                text.push_str(&format!("Error: command exited with status {code}\n"));
            }
            text.push_str(stdout.trim_end());
            if !stderr.trim().is_empty() {
                text.push_str("\nSTDERR: ");
                text.push_str(stderr.trim_end());
            }

            Ok(text)
        })
    }
}
