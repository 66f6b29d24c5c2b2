//! File read and write tools.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::protocol::types::{ToolParameter, ToolSchema};
use crate::tools::ToolExecutor;
use crate::{AppError, Result};

/// Resolve `path` against the working directory when it is relative.
fn resolve(path: &str, working_directory: &Path) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        working_directory.join(candidate)
    }
}

fn path_parameter() -> (String, ToolParameter) {
    (
        "path".to_owned(),
        ToolParameter {
            description: "File path, resolved against the session working directory".into(),
            param_type: "string".into(),
            default: None,
            allowed_values: None,
        },
    )
}

fn required_path_arg(arguments: &Value, tool: &str) -> Result<String> {
    arguments
        .get("path")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AppError::InvalidParams(format!("{tool} requires a string 'path' argument")))
}

/// Reads a UTF-8 text file.
pub struct ReadFileTool;

impl ToolExecutor for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a text file from the session working directory"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object([path_parameter()], ["path".to_owned()])
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute<'a>(
        &'a self,
        arguments: Value,
        working_directory: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let path = resolve(&required_path_arg(&arguments, "read_file")?, working_directory);
            debug!(path = %path.display(), "reading file");
            fs::read_to_string(&path)
                .await
                .map_err(|e| AppError::Tool(format!("failed to read {}: {e}", path.display())))
        })
    }
}

/// Writes a UTF-8 text file, creating parent directories as needed.
pub struct WriteFileTool;

impl ToolExecutor for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write a text file under the session working directory"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object(
            [
                path_parameter(),
                (
                    "content".to_owned(),
                    ToolParameter {
                        description: "Full file content to write".into(),
                        param_type: "string".into(),
                        default: None,
                        allowed_values: None,
                    },
                ),
            ],
            ["path".to_owned(), "content".to_owned()],
        )
    }

    fn execute<'a>(
        &'a self,
        arguments: Value,
        working_directory: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let path = resolve(&required_path_arg(&arguments, "write_file")?, working_directory);
            let content = arguments
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AppError::InvalidParams("write_file requires a string 'content' argument".into())
                })?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Tool(format!("failed to create {}: {e}", parent.display()))
                })?;
            }

            debug!(path = %path.display(), bytes = content.len(), "writing file");
            fs::write(&path, content)
                .await
                .map_err(|e| AppError::Tool(format!("failed to write {}: {e}", path.display())))?;

            Ok(format!("wrote {} bytes to {}", content.len(), path.display()))
        })
    }
}
