//! Integration tests for the OpenAI transport and protocol using wiremock.

use serde_json::json;
use stencil_provider_openai::{OpenAi, OpenAiProtocol};
use stencil_structured::{StructuredLoop, StructuredMode, StructuredRequest};
use stencil_types::{FinishReason, ProviderError, Schema, StructuredError, Tool, ToolDefinition, Transport};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct CityArgs {
    city: String,
}

struct Population;

impl Tool for Population {
    const NAME: &'static str = "population";
    type Args = CityArgs;
    type Output = u64;
    type Error = std::io::Error;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Population of a city".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        }
    }

    async fn call(&self, args: CityArgs) -> Result<u64, std::io::Error> {
        match args.city.as_str() {
            "Paris" => Ok(2_100_000),
            other => Err(std::io::Error::other(format!("unknown city {other}"))),
        }
    }
}

fn schema() -> Schema {
    Schema::new(
        "city_fact",
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}, "population": {"type": "integer"}},
            "required": ["city", "population"]
        }),
    )
}

fn completed(text: &str) -> serde_json::Value {
    json!({
        "id": "resp_final",
        "object": "response",
        "model": "gpt-4o-2024-08-06",
        "status": "completed",
        "output": [{
            "type": "message",
            "id": "msg_1",
            "role": "assistant",
            "content": [{"type": "output_text", "text": text, "annotations": []}]
        }],
        "usage": {
            "input_tokens": 50,
            "input_tokens_details": {"cached_tokens": 0},
            "output_tokens": 12,
            "output_tokens_details": {"reasoning_tokens": 0}
        }
    })
}

fn function_call() -> serde_json::Value {
    json!({
        "id": "resp_tools",
        "object": "response",
        "model": "gpt-4o-2024-08-06",
        "status": "completed",
        "output": [{
            "type": "function_call",
            "id": "fc_1",
            "call_id": "call_pop",
            "name": "population",
            "arguments": "{\"city\":\"Paris\"}"
        }],
        "usage": {"input_tokens": 40, "output_tokens": 8}
    })
}

#[tokio::test]
async fn send_carries_auth_headers_and_lowercases_response_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-organization", "org-1"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "req_123")
                .set_body_json(completed("{}")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAi::new("sk-test").organization("org-1").base_url(server.uri());
    let raw = client
        .send("/v1/responses", &json!({"model": "gpt-4o"}))
        .await
        .unwrap();

    assert_eq!(raw.status, 200);
    assert_eq!(raw.header("x-request-id"), Some("req_123"));
    assert_eq!(raw.body["id"], "resp_final");
}

#[tokio::test]
async fn http_errors_map_to_provider_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri());
    let err = client.send("/v1/responses", &json!({})).await.unwrap_err();
    match err {
        ProviderError::RateLimit { retry_after } => {
            assert_eq!(retry_after, Some(std::time::Duration::from_secs(7)));
        }
        other => panic!("expected RateLimit, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_surfaces_as_transport_error_from_the_loop() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("bad").base_url(server.uri()));
    let request = StructuredRequest::builder("gpt-4o")
        .prompt("hi")
        .schema(schema())
        .build()
        .unwrap();

    let err = structured.run(request).await.unwrap_err();
    assert!(matches!(
        err,
        StructuredError::Transport(ProviderError::Authentication(_))
    ));
}

#[tokio::test]
async fn invalid_json_body_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri());
    let err = client.send("/v1/responses", &json!({})).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(ref m) if m.contains("invalid JSON")));
}

#[tokio::test]
async fn native_structured_run_sends_json_schema_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "text": {"format": {"type": "json_schema", "name": "city_fact"}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completed(r#"{"city":"Paris","population":2100000}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("k").base_url(server.uri()));
    let request = StructuredRequest::builder("gpt-4o")
        .prompt("How many people live in Paris?")
        .schema(schema())
        .build()
        .unwrap();

    let response = structured.run(request).await.unwrap();
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(
        response.structured,
        Some(json!({"city": "Paris", "population": 2_100_000}))
    );
    assert_eq!(response.meta.id, "resp_final");
    assert_eq!(response.usage.prompt_tokens, 50);
    assert_eq!(response.usage.cache_read_input_tokens, Some(0));
}

#[tokio::test]
async fn tool_round_trip_replays_function_call_and_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(function_call()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_partial_json(json!({"text": {"format": {"type": "json_object"}}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completed(r#"{"city":"Paris","population":2100000}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("k").base_url(server.uri()));
    let request = StructuredRequest::builder("gpt-4o")
        .prompt("How many people live in Paris?")
        .schema(schema())
        .tool(Population)
        .mode(StructuredMode::Json)
        .max_steps(3)
        .build()
        .unwrap();

    let response = structured.run(request).await.unwrap();
    assert_eq!(response.steps.len(), 2);
    assert_eq!(response.tool_results.len(), 1);
    assert_eq!(response.tool_results[0].result, json!(2_100_000));
    assert_eq!(response.structured.unwrap()["population"], 2_100_000);
    assert_eq!(response.usage.prompt_tokens, 90);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let input = second["input"].as_array().unwrap();
    // user prompt, JSON instruction, function_call, function_call_output
    assert_eq!(input.len(), 4);
    assert_eq!(input[2]["type"], "function_call");
    assert_eq!(input[2]["call_id"], "call_pop");
    assert_eq!(input[3]["type"], "function_call_output");
    assert_eq!(input[3]["output"], "2100000");
}

#[tokio::test]
async fn malformed_arguments_fail_the_call_not_the_run() {
    let server = MockServer::start().await;

    let mut bad_call = function_call();
    bad_call["output"][0]["arguments"] = json!("{city: Paris}");
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bad_call))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completed(r#"{"city":"Paris","population":0}"#)),
        )
        .mount(&server)
        .await;

    let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("k").base_url(server.uri()));
    let request = StructuredRequest::builder("gpt-4o")
        .prompt("How many people live in Paris?")
        .schema(schema())
        .tool(Population)
        .mode(StructuredMode::Json)
        .max_steps(3)
        .build()
        .unwrap();

    let response = structured.run(request).await.unwrap();
    assert_eq!(response.steps.len(), 2);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.tool_results.len(), 1);
    assert!(response.tool_results[0].is_error);

    let requests = server.received_requests().await.unwrap();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["input"][2]["arguments"], "{city: Paris}");
    assert_eq!(second["input"][3]["type"], "function_call_output");
}

#[tokio::test]
async fn truncated_function_call_ends_the_run_with_length() {
    let server = MockServer::start().await;

    let mut truncated = function_call();
    truncated["status"] = json!("incomplete");
    truncated["incomplete_details"] = json!({"reason": "max_output_tokens"});
    truncated["output"][0]["arguments"] = json!("{\"city\": \"Par");
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(truncated))
        .expect(1)
        .mount(&server)
        .await;

    let structured = StructuredLoop::new(OpenAiProtocol::new(), OpenAi::new("k").base_url(server.uri()));
    let request = StructuredRequest::builder("gpt-4o")
        .prompt("How many people live in Paris?")
        .schema(schema())
        .tool(Population)
        .mode(StructuredMode::Json)
        .max_tokens(16)
        .max_steps(3)
        .build()
        .unwrap();

    let response = structured.run(request).await.unwrap();
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.finish_reason, FinishReason::Length);
    assert!(response.tool_results.is_empty());
    assert!(response.structured.is_none());
}
