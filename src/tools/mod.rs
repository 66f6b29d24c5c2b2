//! Tool execution boundary: the executor trait, the registry, and the
//! built-in tools.

pub mod bash;
pub mod fs;
pub mod registry;
pub mod think;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde_json::Value;

use crate::protocol::types::{ToolDescriptor, ToolSchema};
use crate::Result;

pub use bash::BashTool;
pub use fs::{ReadFileTool, WriteFileTool};
pub use registry::{ToolOutcome, ToolRegistry};
pub use think::ThinkTool;

/// One invocable tool.
///
/// Executors receive the session's working directory explicitly; relative
/// paths and subprocess cwd resolve against it, never against the
/// gateway process directory.
pub trait ToolExecutor: Send + Sync {
    /// Name used in `tools/call` and `tools/list`.
    fn name(&self) -> &'static str;

    /// One-line description shown to clients.
    fn description(&self) -> &'static str;

    /// JSON schema of the `arguments` object.
    fn schema(&self) -> ToolSchema;

    /// Whether the tool only reads state. Read-only tools stay available
    /// in safe mode.
    fn read_only(&self) -> bool {
        false
    }

    /// Run the tool with validated-enough arguments, returning its text
    /// output.
    fn execute<'a>(
        &'a self,
        arguments: Value,
        working_directory: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Wire descriptor for `tools/list`.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            input_schema: self.schema(),
        }
    }
}
