//! Configuration for the structured-output loop.

/// Configuration for [`StructuredLoop`](crate::StructuredLoop).
#[derive(Debug, Clone, Default)]
pub struct StructuredConfig {
    /// Whether to execute tool calls in parallel when a turn requests more
    /// than one. Results keep call order either way.
    pub parallel_tool_execution: bool,
}
