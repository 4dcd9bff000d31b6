//! The per-provider wire-mapping collaborator.
//!
//! A [`WireProtocol`] turns a [`StructuredRequest`] into a provider payload
//! and a provider response into a [`ParsedResponse`]. The loop never looks
//! at provider identity; everything provider-shaped happens behind this
//! trait.

use stencil_types::{
    AdditionalContent, FinishReason, Message, Meta, RawResponse, Schema, StructuredError,
    ToolCall, ToolChoice, ToolDefinition, ToolResult, Usage,
};

use crate::request::StructuredRequest;
use crate::strategy::CapabilityLookup;

/// Typed intermediate representation of one provider response.
///
/// Protocols build this from the raw body; strategies refine it; the loop
/// turns it into a [`Step`](crate::Step).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Text emitted by the model.
    pub text: String,
    /// Classified finish reason.
    pub finish_reason: FinishReason,
    /// The provider's own finish code, kept for diagnostics.
    pub raw_finish_reason: String,
    /// Tool calls requested, in order.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this round-trip.
    pub usage: Usage,
    /// Response metadata.
    pub meta: Meta,
    /// Provider-specific extras (thinking, citations, ...).
    pub additional_content: AdditionalContent,
    /// Raw text of the provider's dedicated structured-output channel, if it has one.
    pub structured_field: Option<String>,
    /// Decoded structured payload. Only native structured output fills this.
    pub structured: Option<serde_json::Value>,
}

/// Wire mapping for one provider API.
///
/// Every method is pure: the same request always yields the same payload.
pub trait WireProtocol: CapabilityLookup + Send + Sync {
    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;

    /// Endpoint path handed to the transport.
    fn endpoint(&self) -> &str;

    /// Provider payload for `request` without any schema constraint.
    fn base_payload(&self, request: &StructuredRequest) -> Result<serde_json::Value, StructuredError>;

    /// The message appended once before the first round-trip in JSON mode.
    fn json_mode_instruction(&self, schema: &Schema) -> Message;

    /// Encode the schema into the provider's native structured-output field.
    fn apply_native_schema(
        &self,
        _payload: &mut serde_json::Value,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        Err(StructuredError::Capability(format!(
            "{} has no native structured output",
            self.name()
        )))
    }

    /// Add whatever JSON mode needs beyond the instruction message.
    fn apply_json_mode(
        &self,
        _payload: &mut serde_json::Value,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        Ok(())
    }

    /// Append `tool` to the payload's tools and force it with `choice`.
    fn apply_forced_tool(
        &self,
        payload: &mut serde_json::Value,
        tool: &ToolDefinition,
        choice: &ToolChoice,
        request: &StructuredRequest,
    ) -> Result<(), StructuredError>;

    /// Map a raw response into the intermediate representation.
    fn parse_response(&self, raw: &RawResponse) -> Result<ParsedResponse, StructuredError>;

    /// The message that feeds tool results back to the model.
    fn tool_result_message(&self, results: &[ToolResult], _request: &StructuredRequest) -> Message {
        Message::tool_results(results)
    }
}
