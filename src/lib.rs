//! Agent Workforce - Task Routing and Decomposition
//!
//! Routes free-text tasks to a registry of workers. A task either goes to an
//! explicitly named worker, or a planner worker decomposes it into ordered
//! subtasks that are executed in turn and synthesized into one answer. When
//! the planner's output cannot be trusted, a lexical scorer picks a worker.
//!
//! # Overview
//!
//! - Structured output recovery from free planner text (`routing::plan_extractor`)
//! - Deterministic lexical worker scoring (`routing::agent_selector`)
//! - The routing state machine with layered fallbacks (`routing::workforce`)
//! - An LLM-backed worker over an OpenAI-compatible provider (`worker`, `llm`)
//! - TOML configuration and structured logging (`config`, `observability`)
//!
//! # Quick Start
//!
//! ```rust
//! use agent_workforce::routing::{PlanExtractor, SelectionMethod, Workforce};
//! use agent_workforce::testing::MockWorker;
//! use agent_workforce::worker::Worker;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Recover a plan from chatty planner output
//! let extractor = PlanExtractor::new()?;
//! let plan = extractor.parse_plan("Sure!\n```json\n{\"subtasks\": [{\"description\": \"Find tide data\", \"agent\": \"researcher\"}]}\n```")?;
//! assert_eq!(plan.steps()[0].worker_name, "researcher");
//!
//! // Without a planner, tasks are routed by lexical score
//! let workers: Vec<Arc<dyn Worker>> = vec![
//!     Arc::new(MockWorker::new("researcher", "Finds and analyzes information", "You research topics.")),
//!     Arc::new(MockWorker::new("writer", "Writes articles and blog posts", "You write content.")),
//! ];
//! let workforce = Workforce::new(workers, None)?;
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let result = runtime.block_on(workforce.execute("Write a blog post about tides", None, None))?;
//! assert_eq!(result.agent, "writer");
//! assert_eq!(result.selection_method, SelectionMethod::IntelligentFallback);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod routing;
pub mod testing;
pub mod worker;

pub use config::{ConfigError, WorkforceConfig};
pub use error::{WorkforceError, WorkforceResult};
pub use routing::{ExecutionResult, SelectionMethod, StepResult, Workforce};
pub use worker::{TaskContext, Worker, WorkerError};
