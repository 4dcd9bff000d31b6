//! The structured-output request and its builder.

use stencil_tool::ToolRegistry;
use stencil_types::{
    Message, ProviderTool, Schema, StructuredError, SystemPrompt, Tool, ToolChoice, ToolDefinition,
};

use crate::strategy::{STRUCTURED_OUTPUT_TOOL, StructuredMode};

/// One logical structured-output call.
///
/// Built once through [`StructuredRequest::builder`]. After that the only
/// change is appending conversation messages while the loop runs.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    model: String,
    messages: Vec<Message>,
    system_prompts: Vec<SystemPrompt>,
    schema: Schema,
    max_steps: usize,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
    tools: ToolRegistry,
    tool_choice: Option<ToolChoice>,
    provider_tools: Vec<ProviderTool>,
    provider_options: serde_json::Map<String, serde_json::Value>,
    mode: StructuredMode,
}

impl StructuredRequest {
    /// Start building a request for `model`.
    #[must_use]
    pub fn builder(model: impl Into<String>) -> StructuredRequestBuilder {
        StructuredRequestBuilder {
            model: model.into(),
            prompt: None,
            messages: None,
            system_prompts: Vec::new(),
            schema: None,
            max_steps: 1,
            temperature: None,
            top_p: None,
            max_tokens: None,
            tools: ToolRegistry::new(),
            tool_choice: None,
            provider_tools: Vec::new(),
            provider_options: serde_json::Map::new(),
            mode: StructuredMode::default(),
        }
    }

    /// Model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The conversation so far.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// System prompts, sent ahead of the conversation.
    #[must_use]
    pub fn system_prompts(&self) -> &[SystemPrompt] {
        &self.system_prompts
    }

    /// The output schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Upper bound on provider round-trips.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Sampling temperature.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Nucleus sampling parameter.
    #[must_use]
    pub fn top_p(&self) -> Option<f64> {
        self.top_p
    }

    /// Output token cap. `None` lets the protocol pick its default.
    #[must_use]
    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// The caller's tools.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Definitions of the caller's tools, sorted by name.
    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Tool selection policy.
    #[must_use]
    pub fn tool_choice(&self) -> Option<&ToolChoice> {
        self.tool_choice.as_ref()
    }

    /// Provider-hosted tools.
    #[must_use]
    pub fn provider_tools(&self) -> &[ProviderTool] {
        &self.provider_tools
    }

    /// The full provider option map.
    #[must_use]
    pub fn provider_options(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.provider_options
    }

    /// Look up a provider option by dotted path, e.g. `"thinking.enabled"`.
    ///
    /// ```
    /// use stencil_structured::StructuredRequest;
    /// use stencil_types::Schema;
    ///
    /// let request = StructuredRequest::builder("claude-sonnet-4")
    ///     .prompt("hi")
    ///     .schema(Schema::new("s", serde_json::json!({})))
    ///     .provider_options(serde_json::json!({"thinking": {"enabled": true}}))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.provider_option("thinking.enabled"), Some(&serde_json::json!(true)));
    /// assert_eq!(request.provider_option("thinking.budgetTokens"), None);
    /// ```
    #[must_use]
    pub fn provider_option(&self, path: &str) -> Option<&serde_json::Value> {
        let mut segments = path.split('.');
        let mut current = self.provider_options.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether a boolean provider option is set to `true`.
    #[must_use]
    pub fn provider_flag(&self, path: &str) -> bool {
        self.provider_option(path)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// The requested elicitation mode.
    #[must_use]
    pub fn mode(&self) -> StructuredMode {
        self.mode
    }

    /// Append a message to the conversation.
    pub(crate) fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Builder for [`StructuredRequest`].
///
/// # Example
///
/// ```
/// use stencil_structured::{StructuredMode, StructuredRequest};
/// use stencil_types::Schema;
///
/// let request = StructuredRequest::builder("gpt-4o")
///     .system_prompt("You extract invoice data.")
///     .prompt("Invoice #42, total 19.99 EUR")
///     .schema(Schema::new("invoice", serde_json::json!({"type": "object"})))
///     .mode(StructuredMode::Structured)
///     .max_steps(3)
///     .build()
///     .unwrap();
/// assert_eq!(request.messages().len(), 1);
/// ```
#[derive(Debug)]
pub struct StructuredRequestBuilder {
    model: String,
    prompt: Option<String>,
    messages: Option<Vec<Message>>,
    system_prompts: Vec<SystemPrompt>,
    schema: Option<Schema>,
    max_steps: usize,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
    tools: ToolRegistry,
    tool_choice: Option<ToolChoice>,
    provider_tools: Vec<ProviderTool>,
    provider_options: serde_json::Map<String, serde_json::Value>,
    mode: StructuredMode,
}

impl StructuredRequestBuilder {
    /// Set a single user prompt. Mutually exclusive with [`messages`](Self::messages).
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the prior conversation. Mutually exclusive with [`prompt`](Self::prompt).
    #[must_use]
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Add a system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<SystemPrompt>) -> Self {
        self.system_prompts.push(prompt.into());
        self
    }

    /// Replace all system prompts.
    #[must_use]
    pub fn system_prompts(mut self, prompts: Vec<SystemPrompt>) -> Self {
        self.system_prompts = prompts;
        self
    }

    /// Set the output schema. Required.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the maximum number of round-trips (default 1).
    #[must_use]
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set nucleus sampling.
    #[must_use]
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the output token cap.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tool registry.
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Register one strongly-typed tool.
    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Set the tool selection policy.
    #[must_use]
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Add a provider-hosted tool.
    #[must_use]
    pub fn provider_tool(mut self, tool: ProviderTool) -> Self {
        self.provider_tools.push(tool);
        self
    }

    /// Set one top-level provider option.
    #[must_use]
    pub fn provider_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.provider_options.insert(key.into(), value);
        self
    }

    /// Merge an object of provider options. Non-object values are ignored.
    #[must_use]
    pub fn provider_options(mut self, options: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = options {
            self.provider_options.extend(map);
        }
        self
    }

    /// Set the elicitation mode (default [`StructuredMode::Auto`]).
    #[must_use]
    pub fn mode(mut self, mode: StructuredMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate and build the request.
    pub fn build(self) -> Result<StructuredRequest, StructuredError> {
        let messages = match (self.prompt, self.messages) {
            (Some(_), Some(_)) => {
                return Err(StructuredError::InvalidRequest(
                    "only prompt or messages may be supplied, not both".into(),
                ));
            }
            (Some(prompt), None) => vec![Message::user(prompt)],
            (None, Some(messages)) if !messages.is_empty() => messages,
            (None, _) => {
                return Err(StructuredError::InvalidRequest(
                    "a prompt or messages must be supplied".into(),
                ));
            }
        };

        let schema = self.schema.ok_or_else(|| {
            StructuredError::InvalidRequest("a schema is required for structured output".into())
        })?;

        if self.max_steps == 0 {
            return Err(StructuredError::InvalidRequest(
                "max_steps must be at least 1".into(),
            ));
        }

        // Auto may also resolve to forced tool calling.
        let may_force_tool = matches!(self.mode, StructuredMode::ToolCalling | StructuredMode::Auto);
        if may_force_tool && self.tools.get(STRUCTURED_OUTPUT_TOOL).is_some() {
            return Err(StructuredError::InvalidRequest(format!(
                "the tool name `{STRUCTURED_OUTPUT_TOOL}` is reserved for structured output"
            )));
        }

        Ok(StructuredRequest {
            model: self.model,
            messages,
            system_prompts: self.system_prompts,
            schema,
            max_steps: self.max_steps,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            tools: self.tools,
            tool_choice: self.tool_choice,
            provider_tools: self.provider_tools,
            provider_options: self.provider_options,
            mode: self.mode,
        })
    }
}
