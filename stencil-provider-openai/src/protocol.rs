//! [`WireProtocol`] implementation for the OpenAI Responses API.

use serde_json::Value;
use stencil_structured::{Capability, CapabilityLookup, ParsedResponse, StructuredRequest, WireProtocol};
use stencil_types::{Message, RawResponse, Schema, StructuredError, ToolChoice, ToolDefinition};

use crate::mapping::{from_api_response, map_tool_choice, map_tool_definition, native_format, to_api_request};
use crate::resolver::capability_for_model;

/// Wire mapping for `POST /v1/responses`.
///
/// Stateless; pair it with any [`Transport`](stencil_types::Transport),
/// usually [`OpenAi`](crate::OpenAi).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiProtocol;

impl OpenAiProtocol {
    /// Create the protocol.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityLookup for OpenAiProtocol {
    fn capability(&self, model: &str) -> Capability {
        capability_for_model(model)
    }
}

impl WireProtocol for OpenAiProtocol {
    fn name(&self) -> &str {
        "openai"
    }

    fn endpoint(&self) -> &str {
        "/v1/responses"
    }

    fn base_payload(&self, request: &StructuredRequest) -> Result<Value, StructuredError> {
        Ok(to_api_request(request))
    }

    fn json_mode_instruction(&self, schema: &Schema) -> Message {
        Message::system(format!(
            "Respond with JSON that matches the following schema: \n {}",
            schema.to_pretty_string()
        ))
    }

    fn apply_native_schema(
        &self,
        payload: &mut Value,
        request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        payload["text"] = native_format(request);
        Ok(())
    }

    fn apply_json_mode(
        &self,
        payload: &mut Value,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        payload["text"] = serde_json::json!({"format": {"type": "json_object"}});
        Ok(())
    }

    fn apply_forced_tool(
        &self,
        payload: &mut Value,
        tool: &ToolDefinition,
        choice: &ToolChoice,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        let tool = map_tool_definition(tool);
        match payload["tools"].as_array_mut() {
            Some(tools) => tools.push(tool),
            None => payload["tools"] = Value::Array(vec![tool]),
        }
        payload["tool_choice"] = map_tool_choice(choice);
        Ok(())
    }

    fn parse_response(&self, raw: &RawResponse) -> Result<ParsedResponse, StructuredError> {
        from_api_response(raw)
    }
}
