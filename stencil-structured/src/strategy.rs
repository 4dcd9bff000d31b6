//! Output-elicitation strategies.
//!
//! A [`Strategy`] decides how the schema constraint reaches the model and how
//! the model's answer comes back:
//!
//! - [`Strategy::NativeStructured`] uses the provider's schema-typed output
//!   channel and decodes it as soon as the response arrives.
//! - [`Strategy::JsonMode`] asks for JSON in the conversation and decodes the
//!   final text at finalization.
//! - [`Strategy::ForcedToolCalling`] forces a call to a synthetic tool whose
//!   input schema is the output schema; the call's arguments are the answer.

use serde::{Deserialize, Serialize};
use stencil_types::{FinishReason, StructuredError, ToolChoice, ToolDefinition};

use crate::protocol::{ParsedResponse, WireProtocol};
use crate::request::StructuredRequest;
use crate::response::decode_structured;

/// Name of the synthetic tool used by [`Strategy::ForcedToolCalling`].
pub const STRUCTURED_OUTPUT_TOOL: &str = "output_structured_data";

/// The caller's choice of technique.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredMode {
    /// Let the model's capabilities decide between native and JSON mode.
    #[default]
    Auto,
    /// Require native structured output.
    Structured,
    /// Ask for JSON in the conversation.
    Json,
    /// Force a call to the synthetic output tool.
    ToolCalling,
}

/// What a model supports, as reported by a [`CapabilityLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The model has a native schema-typed output channel.
    NativeStructured,
    /// The model can be asked for JSON.
    JsonMode,
    /// No structured technique is known to work.
    Unsupported,
}

/// Model capability table, consulted only in [`StructuredMode::Auto`] and
/// [`StructuredMode::Structured`].
pub trait CapabilityLookup {
    /// The best technique `model` supports.
    fn capability(&self, model: &str) -> Capability;
}

/// The technique a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Provider-native schema-constrained output.
    NativeStructured,
    /// Free-text JSON guided by an instruction message.
    JsonMode,
    /// A forced call to [`STRUCTURED_OUTPUT_TOOL`].
    ForcedToolCalling,
}

impl Strategy {
    /// Pick the strategy for `request`.
    ///
    /// In `Auto` mode the provider option `use_tool_calling: true` selects
    /// forced tool calling; otherwise the capability table decides.
    pub fn select<L>(request: &StructuredRequest, lookup: &L) -> Result<Self, StructuredError>
    where
        L: CapabilityLookup + ?Sized,
    {
        let model = request.model();
        match request.mode() {
            StructuredMode::Auto if request.provider_flag("use_tool_calling") => {
                Ok(Self::ForcedToolCalling)
            }
            StructuredMode::Auto => match lookup.capability(model) {
                Capability::NativeStructured => Ok(Self::NativeStructured),
                Capability::JsonMode => Ok(Self::JsonMode),
                Capability::Unsupported => Err(StructuredError::Capability(format!(
                    "could not determine structured mode for {model}"
                ))),
            },
            StructuredMode::Structured => match lookup.capability(model) {
                Capability::NativeStructured => Ok(Self::NativeStructured),
                _ => Err(StructuredError::Capability(format!(
                    "{model} does not support structured mode"
                ))),
            },
            StructuredMode::Json => Ok(Self::JsonMode),
            StructuredMode::ToolCalling => Ok(Self::ForcedToolCalling),
        }
    }

    /// One-time conversation changes before the first send.
    pub fn prepare<P>(&self, request: &mut StructuredRequest, protocol: &P)
    where
        P: WireProtocol + ?Sized,
    {
        if let Self::JsonMode = self {
            let instruction = protocol.json_mode_instruction(request.schema());
            request.add_message(instruction);
        }
    }

    /// Inject the schema constraint into an otherwise provider-generic payload.
    pub fn shape_payload<P>(
        &self,
        protocol: &P,
        mut payload: serde_json::Value,
        request: &StructuredRequest,
    ) -> Result<serde_json::Value, StructuredError>
    where
        P: WireProtocol + ?Sized,
    {
        match self {
            Self::NativeStructured => protocol.apply_native_schema(&mut payload, request)?,
            Self::JsonMode => protocol.apply_json_mode(&mut payload, request)?,
            Self::ForcedToolCalling => {
                let tool = output_tool(request);
                let only_tool = request.tools().is_empty() && request.provider_tools().is_empty();
                let choice = if only_tool {
                    ToolChoice::Specific {
                        name: STRUCTURED_OUTPUT_TOOL.to_string(),
                    }
                } else {
                    ToolChoice::Required
                };
                protocol.apply_forced_tool(&mut payload, &tool, &choice, request)?;
            }
        }
        Ok(payload)
    }

    /// Refine a parsed response according to the technique.
    pub fn interpret_response(&self, mut parsed: ParsedResponse) -> Result<ParsedResponse, StructuredError> {
        match self {
            Self::NativeStructured => {
                if let Some(field) = parsed.structured_field.as_deref() {
                    match decode_structured(field) {
                        Ok(value) => parsed.structured = Some(value),
                        Err(e) if parsed.finish_reason == FinishReason::Stop => return Err(e),
                        Err(e) => {
                            tracing::debug!(error = %e, "structured field not decodable on non-stop response");
                        }
                    }
                }
            }
            Self::JsonMode => {}
            Self::ForcedToolCalling => {
                let (output, remaining): (Vec<_>, Vec<_>) = parsed
                    .tool_calls
                    .into_iter()
                    .partition(|call| call.name == STRUCTURED_OUTPUT_TOOL);
                parsed.tool_calls = remaining;
                if let Some(call) = output.into_iter().last() {
                    // Unparseable arguments arrive as the raw string.
                    parsed.text = call
                        .arguments
                        .as_str()
                        .map_or_else(|| call.arguments.to_string(), str::to_string);
                    if parsed.tool_calls.is_empty() && parsed.finish_reason == FinishReason::ToolCalls {
                        parsed.finish_reason = FinishReason::Stop;
                    }
                }
            }
        }
        Ok(parsed)
    }
}

fn output_tool(request: &StructuredRequest) -> ToolDefinition {
    let schema = request.schema();
    ToolDefinition {
        name: STRUCTURED_OUTPUT_TOOL.to_string(),
        description: schema
            .description()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Output the final {} as structured data", schema.name())),
        input_schema: schema.definition().clone(),
    }
}
