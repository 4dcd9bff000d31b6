//! Anthropic Messages API support for stencil.
//!
//! [`Anthropic`] is the HTTP [`Transport`](stencil_types::Transport);
//! [`AnthropicProtocol`] maps structured requests onto `POST /v1/messages`.
//!
//! The Messages API has no schema-typed output channel, so `Auto` mode
//! resolves to JSON mode. Set the provider option `use_tool_calling` (or use
//! `StructuredMode::ToolCalling`) to elicit the answer through a forced tool
//! call instead.
//!
//! ```no_run
//! use stencil_provider_anthropic::{Anthropic, AnthropicProtocol};
//! use stencil_structured::StructuredLoop;
//!
//! let structured = StructuredLoop::new(AnthropicProtocol::new(), Anthropic::new("sk-ant-..."));
//! ```

pub mod client;
pub(crate) mod error;
pub mod mapping;
pub mod protocol;
pub(crate) mod rate_limits;

pub use client::Anthropic;
pub use protocol::AnthropicProtocol;

// Re-export for convenience
pub use stencil_types::ProviderError;
