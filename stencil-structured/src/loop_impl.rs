//! The structured-output orchestration loop.

use stencil_types::{FinishReason, Message, RawResponse, StructuredError, ToolResult, Transport};

use crate::config::StructuredConfig;
use crate::protocol::{ParsedResponse, WireProtocol};
use crate::request::StructuredRequest;
use crate::response::{Response, ResponseBuilder};
use crate::step::Step;
use crate::strategy::Strategy;

/// Where a run currently is.
enum LoopState {
    AwaitingSend,
    Interpreting(RawResponse),
    ExecutingTools(ParsedResponse),
    Finalized,
    Failed(StructuredError),
}

/// Drives one structured-output conversation to a [`Response`].
///
/// Round-trips are strictly sequential: each payload depends on the full
/// history produced by the previous ones. A run is isolated; the loop holds
/// no per-run state and can serve concurrent runs.
pub struct StructuredLoop<P: WireProtocol, T: Transport> {
    protocol: P,
    transport: T,
    config: StructuredConfig,
}

impl<P: WireProtocol, T: Transport> StructuredLoop<P, T> {
    /// Create a loop with the default configuration.
    #[must_use]
    pub fn new(protocol: P, transport: T) -> Self {
        Self::builder(protocol, transport).build()
    }

    /// Create a builder with the required protocol and transport.
    #[must_use]
    pub fn builder(protocol: P, transport: T) -> StructuredLoopBuilder<P, T> {
        StructuredLoopBuilder {
            protocol,
            transport,
            config: StructuredConfig::default(),
        }
    }

    /// The wire protocol.
    #[must_use]
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The loop configuration.
    #[must_use]
    pub fn config(&self) -> &StructuredConfig {
        &self.config
    }

    /// The outbound payload for `request` under `strategy`.
    ///
    /// Pure: an unchanged request always yields the same payload.
    pub fn build_payload(
        &self,
        strategy: Strategy,
        request: &StructuredRequest,
    ) -> Result<serde_json::Value, StructuredError> {
        let base = self.protocol.base_payload(request)?;
        strategy.shape_payload(&self.protocol, base, request)
    }

    /// Run `request` to completion.
    ///
    /// Returns a complete [`Response`] or the single error that stopped the
    /// run. Steps recorded before a failure are dropped with the run.
    #[tracing::instrument(skip_all, fields(provider = self.protocol.name(), model = %request.model()))]
    pub async fn run(&self, mut request: StructuredRequest) -> Result<Response, StructuredError> {
        let strategy = Strategy::select(&request, &self.protocol)?;
        tracing::debug!(?strategy, max_steps = request.max_steps(), "starting structured run");
        strategy.prepare(&mut request, &self.protocol);

        let mut builder = ResponseBuilder::new();
        let mut state = LoopState::AwaitingSend;

        loop {
            state = match state {
                LoopState::AwaitingSend => match self.build_payload(strategy, &request) {
                    Ok(payload) => {
                        match self.transport.send(self.protocol.endpoint(), &payload).await {
                            Ok(raw) => LoopState::Interpreting(raw),
                            Err(e) => LoopState::Failed(e.into()),
                        }
                    }
                    Err(e) => LoopState::Failed(e),
                },

                LoopState::Interpreting(raw) => {
                    match self.interpret(strategy, &raw, &mut request, &mut builder) {
                        Ok(parsed) => match parsed.finish_reason {
                            FinishReason::ToolCalls => LoopState::ExecutingTools(parsed),
                            FinishReason::Stop | FinishReason::Length => {
                                let step = record_step(parsed, Vec::new(), &request);
                                log_step(builder.steps().len(), &step);
                                builder.add_step(step);
                                LoopState::Finalized
                            }
                            FinishReason::Unknown => {
                                LoopState::Failed(StructuredError::UnknownFinishReason {
                                    provider: self.protocol.name().to_string(),
                                    raw: parsed.raw_finish_reason,
                                })
                            }
                        },
                        Err(e) => LoopState::Failed(e),
                    }
                }

                LoopState::ExecutingTools(parsed) => {
                    let results = request
                        .tools()
                        .call_tools(&parsed.tool_calls, self.config.parallel_tool_execution)
                        .await;
                    let message = self.protocol.tool_result_message(&results, &request);
                    builder.add_response_message(message.clone());
                    request.add_message(message);

                    let step = record_step(parsed, results, &request);
                    log_step(builder.steps().len(), &step);
                    builder.add_step(step);

                    if builder.steps().len() < request.max_steps() {
                        LoopState::AwaitingSend
                    } else {
                        tracing::warn!(
                            max_steps = request.max_steps(),
                            "step budget exhausted while tools were still requested"
                        );
                        LoopState::Finalized
                    }
                }

                LoopState::Finalized => return builder.to_response(),
                LoopState::Failed(e) => {
                    tracing::debug!(error = %e, steps = builder.steps().len(), "structured run failed");
                    return Err(e);
                }
            };
        }
    }

    /// Parse one raw response and record the assistant turn.
    fn interpret(
        &self,
        strategy: Strategy,
        raw: &RawResponse,
        request: &mut StructuredRequest,
        builder: &mut ResponseBuilder,
    ) -> Result<ParsedResponse, StructuredError> {
        let parsed = self.protocol.parse_response(raw)?;
        let parsed = strategy.interpret_response(parsed)?;

        let message = Message::assistant_turn(
            &parsed.text,
            &parsed.tool_calls,
            parsed.additional_content.clone(),
        );
        builder.add_response_message(message.clone());
        request.add_message(message);

        Ok(parsed)
    }
}

fn log_step(index: usize, step: &Step) {
    tracing::debug!(
        step = index,
        finish_reason = ?step.finish_reason,
        tool_calls = step.tool_calls.len(),
        prompt_tokens = step.usage.prompt_tokens,
        completion_tokens = step.usage.completion_tokens,
        "recorded step"
    );
}

fn record_step(parsed: ParsedResponse, tool_results: Vec<ToolResult>, request: &StructuredRequest) -> Step {
    Step {
        text: parsed.text,
        finish_reason: parsed.finish_reason,
        tool_calls: parsed.tool_calls,
        tool_results,
        usage: parsed.usage,
        meta: parsed.meta,
        messages: request.messages().to_vec(),
        system_prompts: request.system_prompts().to_vec(),
        additional_content: parsed.additional_content,
        structured: parsed.structured,
    }
}

/// Builder for [`StructuredLoop`].
///
/// # Example
///
/// ```ignore
/// let structured = StructuredLoop::builder(protocol, transport)
///     .parallel_tool_execution(true)
///     .build();
/// let response = structured.run(request).await?;
/// ```
pub struct StructuredLoopBuilder<P: WireProtocol, T: Transport> {
    protocol: P,
    transport: T,
    config: StructuredConfig,
}

impl<P: WireProtocol, T: Transport> StructuredLoopBuilder<P, T> {
    /// Set the full loop configuration.
    #[must_use]
    pub fn config(mut self, config: StructuredConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable parallel tool execution (convenience for setting `config.parallel_tool_execution`).
    #[must_use]
    pub fn parallel_tool_execution(mut self, parallel: bool) -> Self {
        self.config.parallel_tool_execution = parallel;
        self
    }

    /// Build the [`StructuredLoop`].
    #[must_use]
    pub fn build(self) -> StructuredLoop<P, T> {
        StructuredLoop {
            protocol: self.protocol,
            transport: self.transport,
            config: self.config,
        }
    }
}
