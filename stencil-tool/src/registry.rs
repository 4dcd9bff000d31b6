//! Tool registry: register, lookup, and execute tools.

use std::collections::HashMap;
use std::sync::Arc;

use stencil_types::{Tool, ToolCall, ToolDefinition, ToolDyn, ToolError, ToolResult};

/// Registry of caller tools.
///
/// Tools are stored as type-erased [`ToolDyn`] trait objects, keyed by name.
/// Registering a second tool under the same name replaces the first.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strongly-typed tool (auto-erased to `ToolDyn`).
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(T::NAME.to_string(), Arc::new(tool));
        self
    }

    /// Register a pre-erased tool.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for all registered tools, sorted by name so that payloads
    /// built from them are stable.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call_dyn(input).await
    }

    /// Answer one tool call. Never fails: errors become a failed result.
    pub async fn call_tool(&self, call: &ToolCall) -> ToolResult {
        match self.execute(&call.name, call.arguments.clone()).await {
            Ok(output) => ToolResult::success(call, output),
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
                ToolResult::failure(call, e.to_string())
            }
        }
    }

    /// Answer every call of one model turn.
    ///
    /// Returns exactly one result per call, in call order. With `parallel`
    /// set the calls run concurrently; sibling calls must not depend on
    /// each other either way.
    pub async fn call_tools(&self, calls: &[ToolCall], parallel: bool) -> Vec<ToolResult> {
        tracing::debug!(count = calls.len(), parallel, "executing tool calls");
        if parallel && calls.len() > 1 {
            futures::future::join_all(calls.iter().map(|call| self.call_tool(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.call_tool(call).await);
            }
            results
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
