//! Step accumulation and final response aggregation.

use serde::de::DeserializeOwned;
use stencil_types::{
    AdditionalContent, FinishReason, Message, Meta, StructuredError, ToolCall, ToolResult, Usage,
};

use crate::step::Step;

/// The final result of a structured-output run.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Every round-trip, in order.
    pub steps: Vec<Step>,
    /// Messages emitted during the run (assistant turns and tool results), in order.
    pub response_messages: Vec<Message>,
    /// Text of the final step.
    pub text: String,
    /// The decoded structured payload. `None` when the run ended without a
    /// decodable answer (e.g. truncated by the token limit).
    pub structured: Option<serde_json::Value>,
    /// Finish reason of the final step.
    pub finish_reason: FinishReason,
    /// Every tool call across all steps, step order then call order.
    pub tool_calls: Vec<ToolCall>,
    /// Every tool result across all steps, step order then call order.
    pub tool_results: Vec<ToolResult>,
    /// Usage summed across steps.
    pub usage: Usage,
    /// Metadata of the final step.
    pub meta: Meta,
    /// Provider extras of the final step.
    pub additional_content: AdditionalContent,
}

impl Response {
    /// Deserialize the structured payload into `T`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(serde::Deserialize, schemars::JsonSchema)]
    /// struct Review { rating: u8, summary: String }
    ///
    /// let review: Review = response.structured_as()?;
    /// ```
    pub fn structured_as<T: DeserializeOwned>(&self) -> Result<T, StructuredError> {
        let value = self.structured.clone().unwrap_or(serde_json::Value::Null);
        let text = value.to_string();
        serde_json::from_value(value).map_err(|e| StructuredError::decoding(text, e))
    }
}

/// Accumulates steps and emitted messages for one run.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    steps: Vec<Step>,
    response_messages: Vec<Message>,
}

impl ResponseBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step.
    pub fn add_step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Record an emitted message.
    pub fn add_response_message(&mut self, message: Message) -> &mut Self {
        self.response_messages.push(message);
        self
    }

    /// Steps recorded so far.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Messages recorded so far.
    #[must_use]
    pub fn response_messages(&self) -> &[Message] {
        &self.response_messages
    }

    /// Aggregate into the final [`Response`].
    ///
    /// The structured payload comes from the last step as-is when that step
    /// already carries one or did not end with [`FinishReason::Stop`].
    /// Otherwise the last step's text is decoded as JSON.
    pub fn to_response(self) -> Result<Response, StructuredError> {
        let Some(last) = self.steps.last() else {
            return Err(StructuredError::InvalidResponse(
                "no steps were recorded".into(),
            ));
        };

        let structured = if last.structured.is_some() || last.finish_reason != FinishReason::Stop {
            last.structured.clone()
        } else {
            Some(decode_structured(&last.text)?)
        };

        let text = last.text.clone();
        let finish_reason = last.finish_reason;
        let meta = last.meta.clone();
        let additional_content = last.additional_content.clone();
        let usage = Usage::sum(self.steps.iter().map(|s| &s.usage));
        let tool_calls = self.steps.iter().flat_map(|s| s.tool_calls.iter().cloned()).collect();
        let tool_results = self
            .steps
            .iter()
            .flat_map(|s| s.tool_results.iter().cloned())
            .collect();

        Ok(Response {
            steps: self.steps,
            response_messages: self.response_messages,
            text,
            structured,
            finish_reason,
            tool_calls,
            tool_results,
            usage,
            meta,
            additional_content,
        })
    }
}

/// Decode model output as a JSON document.
///
/// A document wrapped in a single markdown code fence is accepted. On
/// failure the error carries the input text.
pub fn decode_structured(text: &str) -> Result<serde_json::Value, StructuredError> {
    match serde_json::from_str(text.trim()) {
        Ok(value) => Ok(value),
        Err(source) => strip_code_fence(text)
            .and_then(|inner| serde_json::from_str(inner).ok())
            .ok_or_else(|| StructuredError::decoding(text, source)),
    }
}

/// The body of a ```` ```json ```` (or bare ```` ``` ````) fence spanning the whole text.
fn strip_code_fence(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix("```")?;
    let body_start = rest.find('\n')? + 1;
    let body = rest[body_start..].strip_suffix("```")?;
    Some(body.trim())
}
