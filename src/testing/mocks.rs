//! Mock implementations for testing
//!
//! Provides mock Worker, LlmProvider and WorkerSelector implementations so the
//! routing state machine can be exercised without a real LLM.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::routing::agent_selector::{SelectionError, WorkerSelector};
use crate::worker::{TaskContext, Worker, WorkerError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type RecordedCall = (String, TaskContext);

/// Mock worker with scripted responses
///
/// Responses are returned in order and cycle once exhausted. With no scripted
/// responses the worker answers `"<name> result"`.
#[derive(Debug, Clone)]
pub struct MockWorker {
    pub name: String,
    pub description: String,
    pub directive: String,
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub should_fail: bool,
}

impl MockWorker {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            directive: directive.into(),
            responses: Vec::new(),
            current_response: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn with_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.responses = responses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Worker for MockWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn directive(&self) -> &str {
        &self.directive
    }

    async fn run(&self, task: &str, context: &TaskContext) -> Result<String, WorkerError> {
        self.calls
            .lock()
            .await
            .push((task.to_string(), context.clone()));

        if self.should_fail {
            return Err(WorkerError::execution_failed(
                &self.name,
                "Mock worker failure",
            ));
        }

        if self.responses.is_empty() {
            return Ok(format!("{} result", self.name));
        }

        let mut current = self.current_response.lock().await;
        let response = self.responses[*current % self.responses.len()].clone();
        *current += 1;
        Ok(response)
    }
}

/// Mock LLM provider for testing
#[derive(Debug)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            current_response: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        self.requests.lock().await.push(request);

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.responses.len().max(1);
        *current += 1;

        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[response_idx].clone()
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::NetworkError("Mock health check failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Selector that always answers with the same name, registered or not
#[derive(Debug, Clone)]
pub struct FixedSelector {
    pub choice: String,
}

impl FixedSelector {
    pub fn new(choice: impl Into<String>) -> Self {
        Self {
            choice: choice.into(),
        }
    }
}

impl WorkerSelector for FixedSelector {
    fn rebuild(&mut self, _workers: &[Arc<dyn Worker>]) {}

    fn select_best_agent(
        &self,
        _task: &str,
        _context: Option<&TaskContext>,
    ) -> Result<String, SelectionError> {
        Ok(self.choice.clone())
    }

    fn get_ranked_agents(&self, _task: &str) -> Vec<(String, f64)> {
        vec![(self.choice.clone(), 1.0)]
    }
}

/// Selector that can never pick a worker
#[derive(Debug, Clone, Default)]
pub struct FailingSelector;

impl WorkerSelector for FailingSelector {
    fn rebuild(&mut self, _workers: &[Arc<dyn Worker>]) {}

    fn select_best_agent(
        &self,
        _task: &str,
        _context: Option<&TaskContext>,
    ) -> Result<String, SelectionError> {
        Err(SelectionError::NoWorkers)
    }

    fn get_ranked_agents(&self, _task: &str) -> Vec<(String, f64)> {
        Vec::new()
    }
}
