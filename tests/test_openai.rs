//! Integration tests for the OpenAI-compatible provider
//!
//! Tests behavioral contracts against a mock HTTP server:
//! - Request/response handling and token usage
//! - Bearer auth only when a key is configured (local endpoints need none)
//! - Error scenarios (auth failures, client errors, empty choices)
//! - Retry on server errors
//! - LLM-backed workers and a full workforce over the wire

use agent_workforce::llm::provider::{
    CompletionRequest, FinishReason, LlmError, LlmProvider, Message,
};
use agent_workforce::llm::providers::openai::{OpenAiConfig, OpenAiProvider};
use agent_workforce::routing::{SelectionMethod, Workforce};
use agent_workforce::worker::{LlmWorker, TaskContext, Worker, WorkerError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: Some("test-api-key".to_string()),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn local_config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: None,
        ..test_config(base_url)
    }
}

fn test_request(model: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user("Hello")],
        model: model.to_string(),
        max_tokens: Some(100),
        temperature: Some(0.7),
        metadata: HashMap::new(),
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gpt-4",
        "choices": [
            {
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }
        ],
        "usage": {"prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25}
    })
}

#[tokio::test]
async fn test_openai_provider_returns_successful_completion_with_valid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello there")))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();

    assert_eq!(response.content, Some("Hello there".to_string()));
    assert_eq!(response.model, "gpt-4");
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 15);
    assert_eq!(response.usage.total_tokens, 25);
    assert!(matches!(response.finish_reason, FinishReason::Stop));
}

#[tokio::test]
async fn test_openai_provider_sends_model_and_sampling_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 100,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4o-mini")).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_local_endpoint_works_without_api_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("local answer")))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(local_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("llama3")).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("local answer"));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_openai_provider_returns_auth_error_on_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error": {"message": "Incorrect API key provided"}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    match result.unwrap_err() {
        LlmError::AuthenticationFailed(msg) => assert!(msg.contains("401")),
        other => panic!("Expected AuthenticationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_provider_returns_api_error_on_client_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error": {"message": "This model's maximum context length is 8192 tokens"}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    match result.unwrap_err() {
        LlmError::ApiError(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("maximum context length"));
        }
        other => panic!("Expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_provider_retries_on_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service temporarily unavailable"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Success after retry")))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();

    assert_eq!(response.content, Some("Success after retry".to_string()));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_openai_provider_fails_after_all_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    match result.unwrap_err() {
        LlmError::ApiError(msg) => assert!(msg.contains("server error")),
        other => panic!("Expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_provider_converts_length_finish_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4",
            "choices": [
                {
                    "message": {"role": "assistant", "content": "Truncated"},
                    "finish_reason": "length"
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();

    assert!(matches!(response.finish_reason, FinishReason::Length));
    // Missing usage is reported as zero
    assert_eq!(response.usage.total_tokens, 0);
}

#[tokio::test]
async fn test_openai_provider_returns_error_when_choices_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4",
            "choices": []
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_provider_returns_error_when_json_parsing_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_provider_preserves_request_metadata() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Response")))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();

    let mut request = test_request("gpt-4");
    request
        .metadata
        .insert("request_id".to_string(), "test-456".to_string());

    let response = provider.complete(request).await.unwrap();
    assert_eq!(
        response.metadata.get("request_id"),
        Some(&"test-456".to_string())
    );
}

#[tokio::test]
async fn test_openai_health_check_succeeds_when_models_endpoint_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    assert!(provider.health_check().await.is_ok());
}

#[tokio::test]
async fn test_openai_health_check_fails_when_auth_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    match provider.health_check().await.unwrap_err() {
        LlmError::AuthenticationFailed(_) => {}
        other => panic!("Expected AuthenticationFailed, got {other:?}"),
    }
}

#[test]
fn test_openai_provider_creation_requires_api_key_for_hosted_endpoint() {
    let result = OpenAiProvider::new(OpenAiConfig::default());
    assert!(matches!(result, Err(LlmError::NotConfigured(_))));
}

#[tokio::test]
async fn test_llm_worker_sends_directive_and_context() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "writer-model",
            "temperature": 0.3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("A calm haiku")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = Arc::new(OpenAiProvider::new(local_config(&mock_server.uri())).unwrap());
    let worker = LlmWorker::new(
        "writer",
        "Writes content",
        "You are a poet.",
        provider,
        "writer-model",
    )
    .with_temperature(0.3);

    let mut context = TaskContext::new();
    context.insert("tone".to_string(), json!("calm"));

    let result = worker.run("Write a haiku", &context).await.unwrap();
    assert_eq!(result, "A calm haiku");

    let requests = mock_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], json!("system"));
    assert_eq!(body["messages"][0]["content"], json!("You are a poet."));
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("Write a haiku\n\nContext:\n"));
    assert!(user.contains("\"tone\": \"calm\""));
}

#[tokio::test]
async fn test_llm_worker_rejects_blank_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&mock_server)
        .await;

    let provider = Arc::new(OpenAiProvider::new(local_config(&mock_server.uri())).unwrap());
    let worker = LlmWorker::new("writer", "Writes", "You write.", provider, "m");

    let result = worker.run("Write", &TaskContext::new()).await;
    assert!(matches!(result, Err(WorkerError::ExecutionFailed { .. })));
}

#[tokio::test]
async fn test_workforce_over_http_with_planner() {
    let mock_server = MockServer::start().await;

    let plan = r#"```json
{"subtasks": [{"description": "Research tides", "agent": "researcher", "order": 1}]}
```"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "planner-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(plan)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "planner-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Tides explained")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "worker-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Moon pulls water")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider: Arc<dyn LlmProvider> =
        Arc::new(OpenAiProvider::new(local_config(&mock_server.uri())).unwrap());
    let researcher: Arc<dyn Worker> = Arc::new(LlmWorker::new(
        "researcher",
        "Finds information",
        "You research.",
        provider.clone(),
        "worker-model",
    ));
    let planner: Arc<dyn Worker> = Arc::new(LlmWorker::new(
        "planner",
        "Plans work",
        "You plan.",
        provider,
        "planner-model",
    ));

    let workforce = Workforce::new(vec![researcher], Some(planner)).unwrap();
    let result = workforce.execute("Explain tides", None, None).await.unwrap();

    assert_eq!(result.selection_method, SelectionMethod::Planned);
    assert_eq!(result.result, "Tides explained");
    assert_eq!(result.subtasks[0].result, "Moon pulls water");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}
