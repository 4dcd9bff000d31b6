//! [`WireProtocol`] implementation for the Anthropic Messages API.

use serde_json::Value;
use stencil_structured::{Capability, CapabilityLookup, ParsedResponse, StructuredRequest, WireProtocol};
use stencil_types::{
    CacheControl, Message, RawResponse, Schema, StructuredError, ToolChoice, ToolDefinition,
    ToolResult,
};

use crate::mapping::{from_api_response, map_tool_choice, map_tool_definition, thinking_enabled, to_api_request};

/// Wire mapping for `POST /v1/messages`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicProtocol;

impl AnthropicProtocol {
    /// Create the protocol.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityLookup for AnthropicProtocol {
    /// Every Claude model follows JSON instructions; none has a schema channel.
    fn capability(&self, _model: &str) -> Capability {
        Capability::JsonMode
    }
}

impl WireProtocol for AnthropicProtocol {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn endpoint(&self) -> &str {
        "/v1/messages"
    }

    fn base_payload(&self, request: &StructuredRequest) -> Result<Value, StructuredError> {
        Ok(to_api_request(request))
    }

    fn json_mode_instruction(&self, schema: &Schema) -> Message {
        Message::user(format!(
            "Respond with ONLY a JSON document that matches the following schema. \
             Do not wrap it in a code block and do not add any text before or after it.\n{}",
            schema.to_pretty_string()
        ))
    }

    fn apply_forced_tool(
        &self,
        payload: &mut Value,
        tool: &ToolDefinition,
        choice: &ToolChoice,
        request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        if thinking_enabled(request) {
            return Err(StructuredError::Capability(
                "anthropic cannot force a tool call while extended thinking is enabled".into(),
            ));
        }
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

    /// Honours the provider option `tool_result_cache_type`.
    fn tool_result_message(&self, results: &[ToolResult], request: &StructuredRequest) -> Message {
        let message = Message::tool_results(results);
        match request.provider_option("tool_result_cache_type").and_then(Value::as_str) {
            Some(kind) => message.with_cache_control(CacheControl {
                kind: kind.to_string(),
                ttl: None,
            }),
            None => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_structured::{Strategy, StructuredMode};
    use stencil_types::{Role, ToolCall};

    fn builder() -> stencil_structured::StructuredRequestBuilder {
        StructuredRequest::builder("claude-sonnet-4-20250514")
            .prompt("Summarize")
            .schema(Schema::new("summary", json!({"type": "object"})))
    }

    #[test]
    fn auto_is_json_mode_unless_tool_calling_requested() {
        let protocol = AnthropicProtocol::new();
        let req = builder().build().unwrap();
        assert_eq!(Strategy::select(&req, &protocol).unwrap(), Strategy::JsonMode);

        let req = builder()
            .provider_option("use_tool_calling", json!(true))
            .build()
            .unwrap();
        assert_eq!(Strategy::select(&req, &protocol).unwrap(), Strategy::ForcedToolCalling);
    }

    #[test]
    fn structured_mode_is_a_capability_error() {
        let protocol = AnthropicProtocol::new();
        let req = builder().mode(StructuredMode::Structured).build().unwrap();
        let err = Strategy::select(&req, &protocol).unwrap_err();
        assert!(matches!(err, StructuredError::Capability(_)));
    }

    #[test]
    fn json_instruction_is_a_user_message() {
        let protocol = AnthropicProtocol::new();
        let mut req = builder().build().unwrap();
        Strategy::JsonMode.prepare(&mut req, &protocol);
        let payload = Strategy::JsonMode
            .shape_payload(&protocol, protocol.base_payload(&req).unwrap(), &req)
            .unwrap();

        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["role"], "user");
        assert!(messages[1]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"type\": \"object\""));
        assert!(payload.get("tool_choice").is_none());
    }

    #[test]
    fn forced_tool_uses_specific_choice() {
        let protocol = AnthropicProtocol::new();
        let req = builder().mode(StructuredMode::ToolCalling).build().unwrap();
        let payload = Strategy::ForcedToolCalling
            .shape_payload(&protocol, protocol.base_payload(&req).unwrap(), &req)
            .unwrap();
        assert_eq!(payload["tools"][0]["name"], "output_structured_data");
        assert_eq!(payload["tools"][0]["input_schema"], json!({"type": "object"}));
        assert_eq!(
            payload["tool_choice"],
            json!({"type": "tool", "name": "output_structured_data"})
        );
    }

    #[test]
    fn forced_tool_with_thinking_is_rejected() {
        let protocol = AnthropicProtocol::new();
        let req = builder()
            .mode(StructuredMode::ToolCalling)
            .provider_options(json!({"thinking": {"enabled": true}}))
            .build()
            .unwrap();
        let err = Strategy::ForcedToolCalling
            .shape_payload(&protocol, protocol.base_payload(&req).unwrap(), &req)
            .unwrap_err();
        assert!(matches!(err, StructuredError::Capability(_)));
    }

    #[test]
    fn tool_result_message_honours_cache_type() {
        let protocol = AnthropicProtocol::new();
        let call = ToolCall::new("toolu_1", "lookup", json!({}));
        let results = [ToolResult::success(&call, json!(1))];

        let plain = protocol.tool_result_message(&results, &builder().build().unwrap());
        assert_eq!(plain.role, Role::User);
        assert!(plain.cache_control.is_none());

        let req = builder()
            .provider_option("tool_result_cache_type", json!("ephemeral"))
            .build()
            .unwrap();
        let cached = protocol.tool_result_message(&results, &req);
        assert_eq!(cached.cache_control.unwrap().kind, "ephemeral");
    }
}
