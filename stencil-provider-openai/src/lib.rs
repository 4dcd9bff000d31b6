//! OpenAI Responses API support for stencil.
//!
//! [`OpenAi`] is the HTTP [`Transport`](stencil_types::Transport);
//! [`OpenAiProtocol`] is the [`WireProtocol`](stencil_structured::WireProtocol)
//! that maps structured requests onto `POST /v1/responses`.
//!
//! ```no_run
//! use stencil_provider_openai::{OpenAi, OpenAiProtocol};
//! use stencil_structured::StructuredLoop;
//!
//! let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("sk-..."));
//! ```

pub mod client;
pub(crate) mod error;
pub mod mapping;
pub mod protocol;
pub mod resolver;

pub use client::OpenAi;
pub use protocol::OpenAiProtocol;
pub use resolver::capability_for_model;

// Re-export for convenience
pub use stencil_types::ProviderError;
