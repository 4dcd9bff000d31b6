//! Request/response mapping between stencil types and the OpenAI Responses API.

use serde_json::{Value, json};
use stencil_structured::{ParsedResponse, StructuredRequest};
use stencil_types::{
    ContentBlock, FinishReason, Message, Meta, RawResponse, Role, StructuredError, ToolCall,
    ToolChoice, ToolDefinition, Usage,
};

/// Provider options copied verbatim into the payload when present.
const PASSTHROUGH_OPTIONS: &[&str] = &[
    "metadata",
    "previous_response_id",
    "truncation",
    "reasoning",
    "service_tier",
    "store",
    "user",
    "parallel_tool_calls",
];

// ─── Request mapping ─────────────────────────────────────────────────────────

/// Build the Responses API payload for `request`, without any schema constraint.
#[must_use]
pub fn to_api_request(request: &StructuredRequest) -> Value {
    let mut body = json!({
        "model": request.model(),
        "input": map_input(request),
    });

    if let Some(max_tokens) = request.max_tokens() {
        body["max_output_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = request.temperature() {
        body["temperature"] = json!(temp);
    }
    if let Some(top_p) = request.top_p() {
        body["top_p"] = json!(top_p);
    }

    let mut tools: Vec<Value> = request.provider_tools().iter().map(|t| t.to_value()).collect();
    tools.extend(request.tool_definitions().iter().map(map_tool_definition));
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools);
        if let Some(choice) = request.tool_choice() {
            body["tool_choice"] = map_tool_choice(choice);
        }
    }

    for key in PASSTHROUGH_OPTIONS {
        if let Some(value) = request.provider_options().get(*key) {
            body[*key] = value.clone();
        }
    }

    body
}

/// System prompts first, then the conversation.
fn map_input(request: &StructuredRequest) -> Value {
    let mut items: Vec<Value> = request
        .system_prompts()
        .iter()
        .map(|p| json!({"role": "system", "content": p.text}))
        .collect();
    for msg in request.messages() {
        map_message(msg, &mut items);
    }
    Value::Array(items)
}

/// A single message may expand to several input items: tool calls and tool
/// results are top-level items in the Responses API.
fn map_message(msg: &Message, items: &mut Vec<Value>) {
    match msg.role {
        Role::System => items.push(json!({"role": "system", "content": msg.text()})),
        Role::User => {
            let mut parts = Vec::new();
            for block in &msg.content {
                match block {
                    ContentBlock::Text { text } => {
                        parts.push(json!({"type": "input_text", "text": text}));
                    }
                    ContentBlock::ToolResult(result) => items.push(json!({
                        "type": "function_call_output",
                        "call_id": result.tool_call_id,
                        "output": result.result_text(),
                    })),
                    ContentBlock::ToolUse(_) => {}
                }
            }
            if !parts.is_empty() {
                items.push(json!({"role": "user", "content": parts}));
            }
        }
        Role::Assistant => {
            let text = msg.text();
            if !text.is_empty() {
                items.push(json!({
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": text}],
                }));
            }
            let mut last_reasoning: Option<&str> = None;
            for call in msg.tool_calls() {
                let reasoning_id = call.reasoning_id.as_deref();
                if reasoning_id.is_some() && reasoning_id != last_reasoning {
                    items.push(json!({
                        "type": "reasoning",
                        "id": reasoning_id,
                        "summary": call.reasoning_summary.clone().unwrap_or_else(|| json!([])),
                    }));
                    last_reasoning = reasoning_id;
                }
                items.push(json!({
                    "type": "function_call",
                    "call_id": call.id,
                    "name": call.name,
                    "arguments": call
                        .arguments
                        .as_str()
                        .map_or_else(|| call.arguments.to_string(), str::to_string),
                }));
            }
        }
    }
}

/// Map a [`ToolDefinition`] to a Responses API function tool.
pub(crate) fn map_tool_definition(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.input_schema,
    })
}

/// Map a [`ToolChoice`] to the Responses API `tool_choice` value.
pub(crate) fn map_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Specific { name } => json!({"type": "function", "name": name}),
    }
}

/// `text.format` for native structured output.
///
/// `strict` is only sent when the provider option `schema.strict` is true.
pub(crate) fn native_format(request: &StructuredRequest) -> Value {
    let schema = request.schema();
    let mut format = json!({
        "type": "json_schema",
        "name": schema.name(),
        "schema": schema.definition(),
    });
    if let Some(description) = schema.description() {
        format["description"] = json!(description);
    }
    if request.provider_flag("schema.strict") {
        format["strict"] = json!(true);
    }
    json!({"format": format})
}

// ─── Response mapping ────────────────────────────────────────────────────────

/// Parse a Responses API body into the intermediate representation.
pub fn from_api_response(raw: &RawResponse) -> Result<ParsedResponse, StructuredError> {
    let body = &raw.body;

    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(StructuredError::InvalidResponse(format!("openai error: {message}")));
    }

    let output = body["output"]
        .as_array()
        .ok_or_else(|| StructuredError::InvalidResponse("missing output array".into()))?;

    if let Some(refusal) = find_refusal(output) {
        return Err(StructuredError::Refusal {
            provider: "openai".into(),
            reason: refusal,
        });
    }

    let text = output
        .last()
        .and_then(|item| item["content"].get(0))
        .and_then(|part| part["text"].as_str())
        .unwrap_or_default()
        .to_string();

    let structured_field = output
        .iter()
        .filter(|item| item["type"] == "message")
        .flat_map(|item| item["content"].as_array().into_iter().flatten())
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part["text"].as_str())
        .last()
        .map(str::to_string);

    let tool_calls = parse_tool_calls(output);
    let (finish_reason, raw_finish_reason) = parse_finish_reason(body, !tool_calls.is_empty());

    Ok(ParsedResponse {
        text,
        finish_reason,
        raw_finish_reason,
        tool_calls,
        usage: parse_usage(&body["usage"]),
        meta: Meta {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            model: body["model"].as_str().unwrap_or_default().to_string(),
            rate_limits: Vec::new(),
        },
        additional_content: Default::default(),
        structured_field,
        structured: None,
    })
}

/// `Some(reason)` when any message part is a refusal.
fn find_refusal(output: &[Value]) -> Option<Option<String>> {
    output
        .iter()
        .flat_map(|item| item["content"].as_array().into_iter().flatten())
        .find(|part| part["type"] == "refusal")
        .map(|part| part["refusal"].as_str().map(str::to_string))
}

/// Function calls, each joined with the reasoning item that preceded it.
///
/// Arguments that are not valid JSON are kept as the raw string so the tool
/// reports the failure on its own result.
fn parse_tool_calls(output: &[Value]) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut reasoning: Option<&Value> = None;
    for item in output {
        match item["type"].as_str() {
            Some("reasoning") => reasoning = Some(item),
            Some("function_call") => {
                let raw_args = item["arguments"].as_str().unwrap_or("{}");
                let arguments = serde_json::from_str(raw_args)
                    .unwrap_or_else(|_| Value::String(raw_args.to_string()));
                let mut call = ToolCall::new(
                    item["call_id"].as_str().unwrap_or_default(),
                    item["name"].as_str().unwrap_or_default(),
                    arguments,
                );
                if let Some(r) = reasoning {
                    call.reasoning_id = r["id"].as_str().map(str::to_string);
                    call.reasoning_summary = r.get("summary").cloned();
                }
                calls.push(call);
            }
            _ => {}
        }
    }
    calls
}

/// Truncation wins over tool calls: a function call cut off by the token
/// limit is a `Length` finish.
fn parse_finish_reason(body: &Value, has_tool_calls: bool) -> (FinishReason, String) {
    let status = body["status"].as_str().unwrap_or_default();
    if status == "incomplete" {
        let reason = body["incomplete_details"]["reason"].as_str().unwrap_or_default();
        let raw = format!("incomplete:{reason}");
        return if reason == "max_output_tokens" {
            (FinishReason::Length, raw)
        } else {
            (FinishReason::Unknown, raw)
        };
    }
    if has_tool_calls {
        return (FinishReason::ToolCalls, "function_call".into());
    }
    match status {
        "completed" => (FinishReason::Stop, status.into()),
        other => (FinishReason::Unknown, other.into()),
    }
}

/// Cached input tokens are reported inside `input_tokens`; split them out.
fn parse_usage(usage: &Value) -> Usage {
    let input = usage["input_tokens"].as_u64().unwrap_or(0);
    let cached = usage["input_tokens_details"]["cached_tokens"].as_u64();
    Usage {
        prompt_tokens: input.saturating_sub(cached.unwrap_or(0)),
        completion_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
        cache_write_input_tokens: None,
        cache_read_input_tokens: cached,
        thought_tokens: usage["output_tokens_details"]["reasoning_tokens"].as_u64(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
