//! LLM-backed worker
//!
//! Sends the worker's directive as the system prompt and the task (plus any
//! non-empty context) as the user message, returning the completion text.

use super::{TaskContext, Worker, WorkerError};
use crate::llm::provider::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct LlmWorker {
    name: String,
    description: String,
    directive: String,
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmWorker {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        directive: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            directive: directive.into(),
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the user message for a task (pure function)
    fn render_user_message(task: &str, context: &TaskContext) -> String {
        if context.is_empty() {
            return task.to_string();
        }

        let context_json =
            serde_json::to_string_pretty(context).unwrap_or_else(|_| format!("{context:?}"));
        format!("{task}\n\nContext:\n{context_json}")
    }
}

#[async_trait]
impl Worker for LlmWorker {
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
        let mut metadata = HashMap::new();
        metadata.insert("worker".to_string(), self.name.clone());

        let request = CompletionRequest {
            messages: vec![
                Message::system(self.directive.clone()),
                Message::user(Self::render_user_message(task, context)),
            ],
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            metadata,
        };

        debug!(worker = %self.name, provider = self.provider.name(), "Running LLM worker");
        let response = self.provider.complete(request).await?;

        match response.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(WorkerError::execution_failed(
                &self.name,
                "provider returned no content",
            )),
        }
    }
}
