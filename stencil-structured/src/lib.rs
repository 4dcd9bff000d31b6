#![deny(missing_docs)]
//! Structured-output orchestration for LLM providers.
//!
//! [`StructuredLoop`] sends a [`StructuredRequest`] through a
//! [`WireProtocol`] and a [`Transport`](stencil_types::Transport), runs any
//! tools the model asks for, and aggregates every round-trip into a
//! [`Response`] whose `structured` field matches the request's schema.
//!
//! ```text
//! AwaitingSend ──send──▶ Interpreting ──tool calls──▶ ExecutingTools ──▶ AwaitingSend
//!                             │                            │ (step budget spent)
//!                             ├──stop / length──▶ Finalized ◀┘
//!                             └──unknown / error──▶ Failed
//! ```

pub mod config;
pub mod loop_impl;
pub mod protocol;
pub mod request;
pub mod response;
pub mod step;
pub mod strategy;

pub use config::StructuredConfig;
pub use loop_impl::{StructuredLoop, StructuredLoopBuilder};
pub use protocol::{ParsedResponse, WireProtocol};
pub use request::{StructuredRequest, StructuredRequestBuilder};
pub use response::{Response, ResponseBuilder, decode_structured};
pub use step::Step;
pub use strategy::{Capability, CapabilityLookup, STRUCTURED_OUTPUT_TOOL, Strategy, StructuredMode};
