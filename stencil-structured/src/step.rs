//! One recorded provider round-trip.

use stencil_types::{
    AdditionalContent, FinishReason, Message, Meta, SystemPrompt, ToolCall, ToolResult, Usage,
};

/// The observable outcome of one provider round-trip.
///
/// Steps are recorded by the [`ResponseBuilder`](crate::ResponseBuilder) in
/// creation order and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Text emitted by the model.
    pub text: String,
    /// Classified finish reason.
    pub finish_reason: FinishReason,
    /// Tool calls requested in this round-trip.
    pub tool_calls: Vec<ToolCall>,
    /// Results for `tool_calls`. Empty unless the finish reason is
    /// [`FinishReason::ToolCalls`].
    pub tool_results: Vec<ToolResult>,
    /// Token usage for this round-trip.
    pub usage: Usage,
    /// Response metadata.
    pub meta: Meta,
    /// The conversation as of the end of this round-trip.
    pub messages: Vec<Message>,
    /// The system prompts in effect.
    pub system_prompts: Vec<SystemPrompt>,
    /// Provider-specific extras.
    pub additional_content: AdditionalContent,
    /// Payload decoded from a native structured channel, if any.
    pub structured: Option<serde_json::Value>,
}
