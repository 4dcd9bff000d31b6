//! Tool registry and the batch executor used between structured-output
//! round-trips.
//!
//! A [`ToolRegistry`] holds type-erased tools. [`ToolRegistry::call_tools`]
//! answers every [`ToolCall`](stencil_types::ToolCall) of one model turn with
//! exactly one [`ToolResult`](stencil_types::ToolResult), in order. Lookup
//! and execution failures become failed results instead of errors.

pub mod registry;

pub use registry::*;
