//! Property-based tests: step bounds, flattening, usage aggregation.

mod common;

use common::*;
use proptest::prelude::*;
use serde_json::json;
use stencil_structured::{Capability, ResponseBuilder, Step, StructuredLoop, StructuredRequest};
use stencil_types::*;

fn usage_strategy() -> impl Strategy<Value = Usage> {
    (
        0u64..10_000,
        0u64..10_000,
        proptest::option::of(0u64..1_000),
        proptest::option::of(0u64..1_000),
        proptest::option::of(0u64..1_000),
    )
        .prop_map(|(p, c, w, r, t)| Usage {
            prompt_tokens: p,
            completion_tokens: c,
            cache_write_input_tokens: w,
            cache_read_input_tokens: r,
            thought_tokens: t,
        })
}

fn step_with(usage: Usage, finish_reason: FinishReason, calls: usize, index: usize) -> Step {
    let tool_calls: Vec<ToolCall> = (0..calls)
        .map(|i| ToolCall::new(format!("s{index}_c{i}"), "add", json!({"a": i, "b": index})))
        .collect();
    let tool_results = tool_calls
        .iter()
        .map(|call| ToolResult::success(call, json!(0)))
        .collect();
    Step {
        text: String::new(),
        finish_reason,
        tool_calls,
        tool_results,
        usage,
        meta: Meta::default(),
        messages: Vec::new(),
        system_prompts: Vec::new(),
        additional_content: AdditionalContent::new(),
        structured: None,
    }
}

fn sum_optional(usages: &[Usage], field: fn(&Usage) -> Option<u64>) -> Option<u64> {
    if usages.iter().all(|u| field(u).is_none()) {
        None
    } else {
        Some(usages.iter().map(|u| field(u).unwrap_or(0)).sum())
    }
}

proptest! {
    #[test]
    fn always_tool_calling_backend_runs_exactly_max_steps(max_steps in 1usize..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = ScriptedTransport::repeating(tool_call("c", "add", json!({"a": 1, "b": 1})));
            let structured = StructuredLoop::new(CanonicalProtocol::new(Capability::JsonMode), transport);
            let request = StructuredRequest::builder("canonical-model")
                .prompt("go")
                .schema(schema())
                .tool(AddTool)
                .max_steps(max_steps)
                .build()
                .unwrap();

            let response = structured.run(request).await.unwrap();

            assert_eq!(structured.transport().send_count(), max_steps);
            assert_eq!(response.steps.len(), max_steps);
        });
    }

    #[test]
    fn usage_aggregates_with_null_preservation(usages in proptest::collection::vec(usage_strategy(), 1..8)) {
        let mut builder = ResponseBuilder::new();
        for (i, usage) in usages.iter().enumerate() {
            builder.add_step(step_with(usage.clone(), FinishReason::Length, 0, i));
        }
        let response = builder.to_response().unwrap();

        prop_assert_eq!(response.usage.prompt_tokens, usages.iter().map(|u| u.prompt_tokens).sum::<u64>());
        prop_assert_eq!(response.usage.completion_tokens, usages.iter().map(|u| u.completion_tokens).sum::<u64>());
        prop_assert_eq!(response.usage.cache_write_input_tokens, sum_optional(&usages, |u| u.cache_write_input_tokens));
        prop_assert_eq!(response.usage.cache_read_input_tokens, sum_optional(&usages, |u| u.cache_read_input_tokens));
        prop_assert_eq!(response.usage.thought_tokens, sum_optional(&usages, |u| u.thought_tokens));
    }

    #[test]
    fn flattened_tool_interactions_follow_step_order(calls_per_step in proptest::collection::vec(0usize..4, 1..6)) {
        let mut builder = ResponseBuilder::new();
        for (i, &calls) in calls_per_step.iter().enumerate() {
            builder.add_step(step_with(Usage::default(), FinishReason::ToolCalls, calls, i));
        }
        let response = builder.to_response().unwrap();

        let expected_ids: Vec<String> = calls_per_step
            .iter()
            .enumerate()
            .flat_map(|(i, &calls)| (0..calls).map(move |c| format!("s{i}_c{c}")))
            .collect();
        let call_ids: Vec<String> = response.tool_calls.iter().map(|c| c.id.clone()).collect();
        let result_ids: Vec<String> = response.tool_results.iter().map(|r| r.tool_call_id.clone()).collect();
        prop_assert_eq!(&call_ids, &expected_ids);
        prop_assert_eq!(&result_ids, &expected_ids);
        prop_assert_eq!(response.tool_calls.len(), calls_per_step.iter().sum::<usize>());
    }
}
