//! Request/response mapping between stencil types and the Anthropic Messages API.

use serde_json::{Value, json};
use stencil_structured::{ParsedResponse, StructuredRequest};
use stencil_types::{
    AdditionalContent, CacheControl, CacheTtl, ContentBlock, FinishReason, Message, Meta,
    RawResponse, Role, StructuredError, ToolCall, ToolChoice, ToolDefinition, Usage,
};

use crate::rate_limits::parse_rate_limits;

/// `max_tokens` is mandatory on the Messages API.
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Thinking budget when `thinking.enabled` is set without `thinking.budgetTokens`.
pub(crate) const DEFAULT_THINKING_BUDGET: u64 = 1024;

// ─── Request mapping ─────────────────────────────────────────────────────────

/// Build the Messages API payload for `request`, without any schema constraint.
#[must_use]
pub fn to_api_request(request: &StructuredRequest) -> Value {
    let mut body = json!({
        "model": request.model(),
        "messages": map_messages(request.messages()),
        "max_tokens": request.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
    });

    let system = map_system(request);
    if !system.is_empty() {
        body["system"] = Value::Array(system);
    }

    if let Some(temp) = request.temperature() {
        body["temperature"] = json!(temp);
    }
    if let Some(top_p) = request.top_p() {
        body["top_p"] = json!(top_p);
    }

    if thinking_enabled(request) {
        let budget = request
            .provider_option("thinking.budgetTokens")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_THINKING_BUDGET);
        body["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
    }

    let mut tools: Vec<Value> = request.provider_tools().iter().map(|t| t.to_value()).collect();
    tools.extend(request.tool_definitions().iter().map(map_tool_definition));
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools);
        if let Some(choice) = request.tool_choice() {
            body["tool_choice"] = map_tool_choice(choice);
        }
    }

    body
}

pub(crate) fn thinking_enabled(request: &StructuredRequest) -> bool {
    request.provider_flag("thinking.enabled")
}

/// System prompts, then any system-role messages lifted out of the conversation.
fn map_system(request: &StructuredRequest) -> Vec<Value> {
    let prompts = request.system_prompts().iter().map(|p| {
        let mut block = json!({"type": "text", "text": p.text});
        if let Some(cc) = &p.cache_control {
            block["cache_control"] = map_cache_control(cc);
        }
        block
    });
    let lifted = request
        .messages()
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| json!({"type": "text", "text": m.text()}));
    prompts.chain(lifted).collect()
}

/// Map conversation messages, skipping system-role ones.
fn map_messages(messages: &[Message]) -> Value {
    let mapped: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(map_message)
        .collect();
    Value::Array(mapped)
}

fn map_message(msg: &Message) -> Value {
    let role = match msg.role {
        Role::Assistant => "assistant",
        _ => "user",
    };

    let mut content = Vec::with_capacity(msg.content.len() + 1);
    if msg.role == Role::Assistant {
        if let Some(blocks) = msg.additional_content.get("thinking_blocks").and_then(Value::as_array) {
            content.extend(blocks.iter().cloned());
        } else if let Some(thinking) = msg.additional_content.get("thinking").and_then(Value::as_str) {
            content.push(json!({
                "type": "thinking",
                "thinking": thinking,
                "signature": msg.additional_content.get("thinking_signature").cloned().unwrap_or(Value::Null),
            }));
        }
    }
    content.extend(msg.content.iter().map(map_content_block));

    if let (Some(cc), Some(last)) = (&msg.cache_control, content.last_mut()) {
        last["cache_control"] = map_cache_control(cc);
    }

    json!({"role": role, "content": content})
}

/// Map a single [`ContentBlock`] to Anthropic's JSON format.
pub(crate) fn map_content_block(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ToolUse(call) => json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.name,
            "input": call.arguments,
        }),
        ContentBlock::ToolResult(result) => json!({
            "type": "tool_result",
            "tool_use_id": result.tool_call_id,
            "content": result.result_text(),
            "is_error": result.is_error,
        }),
    }
}

/// Map a [`CacheControl`] to Anthropic's cache_control object.
fn map_cache_control(cc: &CacheControl) -> Value {
    let mut obj = json!({"type": cc.kind});
    match cc.ttl {
        Some(CacheTtl::FiveMinutes) => obj["ttl"] = json!("5m"),
        Some(CacheTtl::OneHour) => obj["ttl"] = json!("1h"),
        None => {}
    }
    obj
}

/// Map a [`ToolDefinition`] to Anthropic's tool definition format.
pub(crate) fn map_tool_definition(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

/// Map a [`ToolChoice`] to Anthropic's tool_choice format.
pub(crate) fn map_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({"type": "auto"}),
        ToolChoice::None => json!({"type": "none"}),
        ToolChoice::Required => json!({"type": "any"}),
        ToolChoice::Specific { name } => json!({"type": "tool", "name": name}),
    }
}

// ─── Response mapping ────────────────────────────────────────────────────────

/// Parse a Messages API response into the intermediate representation.
///
/// # Errors
///
/// [`StructuredError::InvalidResponse`] for error bodies or a missing content
/// array; [`StructuredError::Refusal`] when the model declined to answer.
pub fn from_api_response(raw: &RawResponse) -> Result<ParsedResponse, StructuredError> {
    let body = &raw.body;

    if body["type"] == "error" {
        let message = body["error"]["message"].as_str().unwrap_or("unknown error");
        return Err(StructuredError::InvalidResponse(format!("anthropic error: {message}")));
    }

    let content = body["content"]
        .as_array()
        .ok_or_else(|| StructuredError::InvalidResponse("missing content array".into()))?;

    let stop_reason = body["stop_reason"].as_str().unwrap_or_default();
    if stop_reason == "refusal" {
        let text = extract_text(content);
        return Err(StructuredError::Refusal {
            provider: "anthropic".into(),
            reason: (!text.is_empty()).then_some(text),
        });
    }

    Ok(ParsedResponse {
        text: extract_text(content),
        finish_reason: parse_stop_reason(stop_reason),
        raw_finish_reason: stop_reason.to_string(),
        tool_calls: extract_tool_calls(content),
        usage: parse_usage(&body["usage"]),
        meta: Meta {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            model: body["model"].as_str().unwrap_or_default().to_string(),
            rate_limits: parse_rate_limits(raw),
        },
        additional_content: extract_additional_content(content),
        structured_field: None,
        structured: None,
    })
}

/// Concatenated text of every text block.
fn extract_text(content: &[Value]) -> String {
    content
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect()
}

fn extract_tool_calls(content: &[Value]) -> Vec<ToolCall> {
    content
        .iter()
        .filter(|b| b["type"] == "tool_use")
        .map(|b| {
            ToolCall::new(
                b["id"].as_str().unwrap_or_default(),
                b["name"].as_str().unwrap_or_default(),
                b["input"].clone(),
            )
        })
        .collect()
}

/// Thinking, its signature, and text parts that carry citations.
///
/// Every `thinking` and `redacted_thinking` block is also kept verbatim, in
/// order, under `thinking_blocks`; the API requires them unchanged when the
/// assistant turn is replayed.
fn extract_additional_content(content: &[Value]) -> AdditionalContent {
    let mut extra = AdditionalContent::new();

    let thinking_blocks: Vec<Value> = content
        .iter()
        .filter(|b| b["type"] == "thinking" || b["type"] == "redacted_thinking")
        .cloned()
        .collect();
    if !thinking_blocks.is_empty() {
        extra.insert("thinking_blocks".into(), Value::Array(thinking_blocks));
    }

    if let Some(block) = content.iter().find(|b| b["type"] == "thinking") {
        if let Some(thinking) = block["thinking"].as_str() {
            extra.insert("thinking".into(), json!(thinking));
        }
        if let Some(signature) = block["signature"].as_str() {
            extra.insert("thinking_signature".into(), json!(signature));
        }
    }

    let cited: Vec<Value> = content
        .iter()
        .filter(|b| b["type"] == "text")
        .filter(|b| b["citations"].as_array().is_some_and(|c| !c.is_empty()))
        .map(|b| json!({"text": b["text"], "citations": b["citations"]}))
        .collect();
    if !cited.is_empty() {
        extra.insert("citations".into(), Value::Array(cited));
    }

    extra
}

fn parse_usage(usage: &Value) -> Usage {
    Usage {
        prompt_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
        completion_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
        cache_write_input_tokens: usage["cache_creation_input_tokens"].as_u64(),
        cache_read_input_tokens: usage["cache_read_input_tokens"].as_u64(),
        thought_tokens: None,
    }
}

fn parse_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "tool_use" => FinishReason::ToolCalls,
        "max_tokens" => FinishReason::Length,
        _ => FinishReason::Unknown,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
