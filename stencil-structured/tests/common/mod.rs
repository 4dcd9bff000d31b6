//! In-memory doubles shared by the stencil-structured integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::{Value, json};
use stencil_structured::{
    Capability, CapabilityLookup, ParsedResponse, StructuredRequest, WireProtocol,
};
use stencil_types::{
    FinishReason, Message, Meta, ProviderError, RawResponse, Schema, StructuredError, Tool,
    ToolCall, ToolChoice, ToolDefinition, Transport, Usage,
};

/// A transport that replays a fixed script and records what it was sent.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, ProviderError>>>,
    sent: Mutex<Vec<(String, Value)>>,
    repeat: Option<RawResponse>,
}

impl ScriptedTransport {
    pub fn new(bodies: Vec<Value>) -> Self {
        Self {
            script: Mutex::new(bodies.into_iter().map(|b| Ok(RawResponse::ok(b))).collect()),
            sent: Mutex::new(Vec::new()),
            repeat: None,
        }
    }

    /// Answer every request with the same body.
    pub fn repeating(body: Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            repeat: Some(RawResponse::ok(body)),
        }
    }

    pub fn with_results(script: Vec<Result<Value, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|r| r.map(RawResponse::ok)).collect()),
            sent: Mutex::new(Vec::new()),
            repeat: None,
        }
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<RawResponse, ProviderError>> + Send {
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), payload.clone()));
        let next = match &self.repeat {
            Some(body) => Ok(body.clone()),
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("ScriptedTransport: script exhausted")),
        };
        async move { next }
    }
}

/// A protocol whose wire format is the canonical shape itself.
///
/// Response bodies look like
/// `{"text", "finish", "tool_calls", "usage", "structured"}`.
pub struct CanonicalProtocol {
    pub capability: Capability,
}

impl CanonicalProtocol {
    pub fn new(capability: Capability) -> Self {
        Self { capability }
    }
}

impl CapabilityLookup for CanonicalProtocol {
    fn capability(&self, _model: &str) -> Capability {
        self.capability
    }
}

impl WireProtocol for CanonicalProtocol {
    fn name(&self) -> &str {
        "canonical"
    }

    fn endpoint(&self) -> &str {
        "/v1/generate"
    }

    fn base_payload(&self, request: &StructuredRequest) -> Result<Value, StructuredError> {
        let messages = serde_json::to_value(request.messages())
            .map_err(|e| StructuredError::InvalidRequest(e.to_string()))?;
        let tools = serde_json::to_value(request.tool_definitions())
            .map_err(|e| StructuredError::InvalidRequest(e.to_string()))?;
        Ok(json!({
            "model": request.model(),
            "messages": messages,
            "tools": tools,
        }))
    }

    fn json_mode_instruction(&self, schema: &Schema) -> Message {
        Message::system(format!("Reply with JSON matching:\n{}", schema.to_pretty_string()))
    }

    fn apply_native_schema(
        &self,
        payload: &mut Value,
        request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        payload["format"] = json!({"schema": request.schema().definition()});
        Ok(())
    }

    fn apply_json_mode(
        &self,
        payload: &mut Value,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        payload["format"] = json!("json");
        Ok(())
    }

    fn apply_forced_tool(
        &self,
        payload: &mut Value,
        tool: &ToolDefinition,
        choice: &ToolChoice,
        _request: &StructuredRequest,
    ) -> Result<(), StructuredError> {
        let tool = serde_json::to_value(tool).map_err(|e| StructuredError::InvalidRequest(e.to_string()))?;
        if let Some(tools) = payload["tools"].as_array_mut() {
            tools.push(tool);
        }
        payload["tool_choice"] =
            serde_json::to_value(choice).map_err(|e| StructuredError::InvalidRequest(e.to_string()))?;
        Ok(())
    }

    fn parse_response(&self, raw: &RawResponse) -> Result<ParsedResponse, StructuredError> {
        let body = &raw.body;
        let raw_finish = body["finish"].as_str().unwrap_or_default().to_string();
        let finish_reason = match raw_finish.as_str() {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            _ => FinishReason::Unknown,
        };
        let tool_calls: Vec<ToolCall> = serde_json::from_value(body["tool_calls"].clone()).unwrap_or_default();
        let usage: Usage = serde_json::from_value(body["usage"].clone()).unwrap_or_default();
        Ok(ParsedResponse {
            text: body["text"].as_str().unwrap_or_default().to_string(),
            finish_reason,
            raw_finish_reason: raw_finish,
            tool_calls,
            usage,
            meta: Meta {
                id: body["id"].as_str().unwrap_or("resp").to_string(),
                model: "canonical-model".into(),
                rate_limits: Vec::new(),
            },
            structured_field: body["structured"].as_str().map(str::to_string),
            ..Default::default()
        })
    }
}

pub fn stop(text: &str) -> Value {
    json!({
        "text": text,
        "finish": "stop",
        "usage": {"prompt_tokens": 10, "completion_tokens": 5}
    })
}

pub fn native_stop(text: &str) -> Value {
    json!({
        "text": text,
        "structured": text,
        "finish": "stop",
        "usage": {"prompt_tokens": 10, "completion_tokens": 5}
    })
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> Value {
    json!({
        "text": "",
        "finish": "tool_calls",
        "tool_calls": [{"id": id, "name": name, "arguments": arguments}],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3}
    })
}

pub fn schema() -> Schema {
    Schema::new(
        "point",
        json!({
            "type": "object",
            "properties": {"x": {"type": "integer"}},
            "required": ["x"]
        }),
    )
}

pub fn request(mode: stencil_structured::StructuredMode) -> StructuredRequest {
    StructuredRequest::builder("canonical-model")
        .prompt("Give me a point")
        .schema(schema())
        .mode(mode)
        .build()
        .unwrap()
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AddArgs {
    pub a: i64,
    pub b: i64,
}

/// Adds two integers.
pub struct AddTool;

impl Tool for AddTool {
    const NAME: &'static str = "add";
    type Args = AddArgs;
    type Output = i64;
    type Error = std::io::Error;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Add two integers".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        }
    }

    async fn call(&self, args: AddArgs) -> Result<i64, std::io::Error> {
        Ok(args.a + args.b)
    }
}
