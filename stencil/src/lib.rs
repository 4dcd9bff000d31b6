#![deny(missing_docs)]
//! # stencil
//!
//! Umbrella crate: a single import surface for schema-constrained structured output.
//! Re-exports the core crates and, behind feature flags, the provider
//! crates, plus a `prelude` for the happy path.
//!
//! ```ignore
//! use stencil::prelude::*;
//!
//! let structured = StructuredLoop::new(AnthropicProtocol::new(), Anthropic::from_env()?);
//! let request = StructuredRequest::builder("claude-sonnet-4-20250514")
//!     .prompt("Review the movie Inception")
//!     .schema(Schema::for_type::<MovieReview>())
//!     .build()?;
//! let review: MovieReview = structured.run(request).await?.structured_as()?;
//! ```

pub use stencil_structured as structured;
pub use stencil_tool as tool;
pub use stencil_types as types;

/// Anthropic Messages API provider.
#[cfg(feature = "provider-anthropic")]
pub use stencil_provider_anthropic as anthropic;
/// OpenAI Responses API provider.
#[cfg(feature = "provider-openai")]
pub use stencil_provider_openai as openai;

/// Happy-path imports for structured-output runs.
pub mod prelude {
    pub use stencil_types::{
        ContentBlock, FinishReason, Message, ProviderError, ProviderTool, Role, Schema,
        StructuredError, SystemPrompt, Tool, ToolCall, ToolChoice, ToolDefinition, ToolDyn,
        ToolError, ToolResult, Transport, Usage,
    };

    pub use stencil_tool::ToolRegistry;

    pub use stencil_structured::{
        Response, StructuredConfig, StructuredLoop, StructuredMode, StructuredRequest,
        WireProtocol,
    };

    #[cfg(feature = "provider-anthropic")]
    pub use stencil_provider_anthropic::{Anthropic, AnthropicProtocol};

    #[cfg(feature = "provider-openai")]
    pub use stencil_provider_openai::{OpenAi, OpenAiProtocol};
}
