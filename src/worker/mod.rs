//! Worker contract
//!
//! A worker is an opaque capability provider: the workforce only knows its
//! name, a short description, its directive text and how to `run` a task.
//! Everything a worker does internally (prompting, tool use, retrieval) is
//! its own business.

use crate::llm::provider::LlmError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod llm_worker;

pub use llm_worker::LlmWorker;

/// Free-form key/value context passed alongside a task
pub type TaskContext = BTreeMap<String, Value>;

/// Capability provider invoked to perform a task or subtask
#[async_trait]
pub trait Worker: Send + Sync {
    /// Unique name within a workforce
    fn name(&self) -> &str;

    /// Short human-readable description of what the worker does
    fn description(&self) -> &str;

    /// Directive (system prompt) text that shapes the worker's behaviour
    fn directive(&self) -> &str;

    /// Perform the task and return its textual output
    async fn run(&self, task: &str, context: &TaskContext) -> Result<String, WorkerError>;
}

/// Errors raised by a worker's own execution
///
/// These are genuine task failures and are never absorbed by routing fallbacks.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Worker '{worker}' failed: {message}")]
    ExecutionFailed { worker: String, message: String },
}

impl WorkerError {
    /// Create an execution failure attributed to a worker
    pub fn execution_failed<W: Into<String>, M: Into<String>>(worker: W, message: M) -> Self {
        Self::ExecutionFailed {
            worker: worker.into(),
            message: message.into(),
        }
    }
}
