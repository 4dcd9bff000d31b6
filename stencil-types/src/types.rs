//! Core message, tool and usage types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-specific extra content attached to a response or message
/// (thinking traces, signatures, citations, ...).
pub type AdditionalContent = BTreeMap<String, serde_json::Value>;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions from the caller.
    System,
    /// A human user, or tool results flowing back to the model.
    User,
    /// The model.
    Assistant,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier for this call.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments, opaque to the orchestration core.
    pub arguments: serde_json::Value,
    /// Reasoning item that produced this call (OpenAI reasoning models).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_id: Option<String>,
    /// Summary attached to the reasoning item, replayed verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_summary: Option<serde_json::Value>,
}

impl ToolCall {
    /// Create a tool call with no reasoning attachment.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            reasoning_id: None,
            reasoning_summary: None,
        }
    }
}

/// The outcome of executing one [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The `id` of the call this result answers.
    pub tool_call_id: String,
    /// Name of the tool that ran (or was looked up).
    pub tool_name: String,
    /// The arguments the tool was called with.
    pub arguments: serde_json::Value,
    /// Tool output on success, an error description on failure.
    pub result: serde_json::Value,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result for `call`.
    #[must_use]
    pub fn success(call: &ToolCall, result: serde_json::Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            is_error: false,
        }
    }

    /// A failed result for `call` carrying an error description.
    #[must_use]
    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: serde_json::Value::String(error.into()),
            is_error: true,
        }
    }

    /// The result rendered as text for wire formats that only accept strings.
    #[must_use]
    pub fn result_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A tool invocation emitted by the assistant.
    ToolUse(ToolCall),
    /// The result of a tool invocation.
    ToolResult(ToolResult),
}

/// Cache time-to-live options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheTtl {
    /// Cache for 5 minutes.
    FiveMinutes,
    /// Cache for 1 hour.
    OneHour,
}

/// Cache control hint for prompt caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    /// Provider cache type (Anthropic: `"ephemeral"`).
    pub kind: String,
    /// Optional time-to-live.
    pub ttl: Option<CacheTtl>,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The content blocks of this message.
    pub content: Vec<ContentBlock>,
    /// Provider-specific content carried alongside (e.g. thinking traces
    /// that must be replayed on the next round-trip).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_content: AdditionalContent,
    /// Optional prompt-cache hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl Message {
    fn with_role(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content,
            additional_content: AdditionalContent::new(),
            cache_control: None,
        }
    }

    /// Create a user message with a single text block.
    ///
    /// # Example
    ///
    /// ```
    /// use stencil_types::Message;
    /// let msg = Message::user("Extract the invoice fields.");
    /// ```
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, vec![ContentBlock::Text { text: text.into() }])
    }

    /// Create a system message with a single text block.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, vec![ContentBlock::Text { text: text.into() }])
    }

    /// Create an assistant message with a single text block.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(
            Role::Assistant,
            vec![ContentBlock::Text { text: text.into() }],
        )
    }

    /// Build the assistant message recorded after a round-trip.
    ///
    /// Empty text produces no text block.
    #[must_use]
    pub fn assistant_turn(
        text: &str,
        tool_calls: &[ToolCall],
        additional_content: AdditionalContent,
    ) -> Self {
        let mut content = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            content.push(ContentBlock::Text {
                text: text.to_string(),
            });
        }
        content.extend(tool_calls.iter().cloned().map(ContentBlock::ToolUse));
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.additional_content = additional_content;
        msg
    }

    /// Build the message feeding tool results back to the model.
    #[must_use]
    pub fn tool_results(results: &[ToolResult]) -> Self {
        Self::with_role(
            Role::User,
            results.iter().cloned().map(ContentBlock::ToolResult).collect(),
        )
    }

    /// Attach a cache-control hint.
    #[must_use]
    pub fn with_cache_control(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    /// Concatenated text of every text block.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every tool call in this message, in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        })
    }
}

/// A system prompt, sent out-of-band from the conversation where the
/// provider supports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// The prompt text.
    pub text: String,
    /// Optional prompt-cache hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl From<String> for SystemPrompt {
    fn from(text: String) -> Self {
        Self {
            text,
            cache_control: None,
        }
    }
}

impl From<&str> for SystemPrompt {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

// --- Tool description types ---

/// Definition of a caller tool made available to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name (unique identifier).
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: serde_json::Value,
}

/// A provider-hosted tool (web search, code interpreter, ...), passed
/// through to the wire payload as `{ "type": kind, ..options }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTool {
    /// Provider tool type, e.g. `"web_search_preview"`.
    pub kind: String,
    /// Additional fields merged into the tool object.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ProviderTool {
    /// Create a provider tool with no options.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: serde_json::Map::new(),
        }
    }

    /// Add an option field.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Wire representation: the type plus its options flattened.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("type".into(), serde_json::Value::String(self.kind.clone()));
        for (k, v) in &self.options {
            obj.insert(k.clone(), v.clone());
        }
        serde_json::Value::Object(obj)
    }
}

/// Tool selection policy for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolChoice {
    /// Model decides whether to use tools.
    Auto,
    /// Model must not use tools.
    None,
    /// Model must use at least one tool.
    Required,
    /// Model must use the named tool.
    Specific {
        /// Name of the required tool.
        name: String,
    },
}

// --- Response-side types ---

/// Backend-reported reason a round-trip ended, classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model requested tool calls.
    ToolCalls,
    /// The model reached a natural end.
    Stop,
    /// Output was truncated by the token limit.
    Length,
    /// Anything the core does not recognize.
    #[default]
    Unknown,
}

/// Token usage for one round-trip, or aggregated across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens (excluding cache reads where the provider reports them separately).
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_write_input_tokens: Option<u64>,
    /// Tokens read from the prompt cache.
    pub cache_read_input_tokens: Option<u64>,
    /// Reasoning ("thought") tokens.
    pub thought_tokens: Option<u64>,
}

impl Usage {
    /// Create usage with only prompt and completion counts.
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            ..Default::default()
        }
    }

    /// Add `delta` into `self`.
    ///
    /// Optional fields stay `None` until some delta reports them; from then
    /// on they are summed, with absent deltas counting as zero.
    pub fn accumulate(&mut self, delta: &Usage) {
        self.prompt_tokens += delta.prompt_tokens;
        self.completion_tokens += delta.completion_tokens;
        if let Some(n) = delta.cache_write_input_tokens {
            *self.cache_write_input_tokens.get_or_insert(0) += n;
        }
        if let Some(n) = delta.cache_read_input_tokens {
            *self.cache_read_input_tokens.get_or_insert(0) += n;
        }
        if let Some(n) = delta.thought_tokens {
            *self.thought_tokens.get_or_insert(0) += n;
        }
    }

    /// Aggregate a sequence of usages.
    pub fn sum<'a>(usages: impl IntoIterator<Item = &'a Usage>) -> Usage {
        usages.into_iter().fold(Usage::default(), |mut total, u| {
            total.accumulate(u);
            total
        })
    }
}

/// A snapshot of one provider rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Limit name, e.g. `"requests"` or `"input-tokens"`.
    pub name: String,
    /// Configured limit.
    pub limit: Option<u64>,
    /// Remaining budget.
    pub remaining: Option<u64>,
    /// When the budget resets.
    pub resets_at: Option<DateTime<Utc>>,
}

/// Response metadata for one round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Provider-assigned response id.
    pub id: String,
    /// Model that actually served the request.
    pub model: String,
    /// Rate-limit snapshot, if the provider reports one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_limits: Vec<RateLimit>,
}
