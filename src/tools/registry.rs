//! Tool registry: lookup, dispatch, and output classification.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::types::ToolDescriptor;
use crate::tools::ToolExecutor;
use crate::{AppError, Result};

/// Outcome of one tool invocation after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text output produced by the tool.
    pub output: String,
    /// Whether the output was classified as a failure.
    pub is_error: bool,
}

/// Registry of named tools with a pre-built descriptor listing.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn ToolExecutor>>,
    descriptors: Vec<ToolDescriptor>,
    legacy_error_heuristic: bool,
}

impl ToolRegistry {
    /// Create an empty registry.
    ///
    /// With `legacy_error_heuristic` set, successful tool output that
    /// starts with `Error:`/`Exception:` or contains `failed` (any
    /// casing) is classified as an error result, preserving the behavior
    /// clients of the previous gateway generation depend on.
    #[must_use]
    pub fn new(legacy_error_heuristic: bool) -> Self {
        Self {
            tools: BTreeMap::new(),
            descriptors: Vec::new(),
            legacy_error_heuristic,
        }
    }

    /// Registry pre-loaded with the built-in tool set.
    #[must_use]
    pub fn with_builtin_tools(legacy_error_heuristic: bool) -> Self {
        let mut registry = Self::new(legacy_error_heuristic);
        registry.register(Arc::new(crate::tools::BashTool::new()));
        registry.register(Arc::new(crate::tools::ReadFileTool));
        registry.register(Arc::new(crate::tools::WriteFileTool));
        registry.register(Arc::new(crate::tools::ThinkTool));
        registry
    }

    /// Add a tool; replaces any previous tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolExecutor>) {
        if self.tools.insert(tool.name(), tool).is_some() {
            warn!("tool registry: replacing existing registration");
        }
        self.rebuild_descriptors();
    }

    /// Descriptors for `tools/list`, in stable name order.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolExecutor>> {
        self.tools.get(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool and classify its output.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ToolNotFound` for unknown names. Executor
    /// failures are not propagated: they become an error-classified
    /// outcome so the caller receives a well-formed result either way.
    pub async fn execute(
        &self,
        name: &str,
        arguments: Value,
        working_directory: &Path,
    ) -> Result<ToolOutcome> {
        let Some(tool) = self.tools.get(name) else {
            return Err(AppError::ToolNotFound(name.to_owned()));
        };

        debug!(tool = name, wd = %working_directory.display(), "executing tool");
        match tool.execute(arguments, working_directory).await {
            Ok(output) => {
                let is_error = self.legacy_error_heuristic && output_looks_like_error(&output);
                Ok(ToolOutcome { output, is_error })
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                Ok(ToolOutcome {
                    output: e.to_string(),
                    is_error: true,
                })
            }
        }
    }

    fn rebuild_descriptors(&mut self) {
        self.descriptors = self.tools.values().map(|t| t.descriptor()).collect();
    }
}

/// Output-sniffing error classification carried over from the previous
/// gateway generation. The substring check is case-insensitive.
fn output_looks_like_error(output: &str) -> bool {
    output.starts_with("Error:")
        || output.starts_with("Exception:")
        || output.to_lowercase().contains("failed")
}
