//! Workforce router
//!
//! Owns the worker registry and drives one task through the routing state
//! machine:
//!
//! ```text
//! START ─┬─ explicit worker registered ──────────────► EXPLICIT ───────────► DONE
//!        ├─ planner configured ─► PLANNED ─► STEP_EXECUTION ─► SYNTHESIS ─► DONE
//!        │                           │ parse failure / empty plan
//!        │                           ▼
//!        └─ no planner ──────► INTELLIGENT_FALLBACK ─► (selector fails) ─► FIRST_WORKER_FALLBACK
//! ```
//!
//! Routing and parsing failures always end in some worker being chosen. Only a
//! worker's own `run` error (planner included) or an empty registry makes
//! `execute` return `Err`.

use super::agent_selector::{AgentSelector, SelectionError, SelectorConfig, WorkerSelector};
use super::plan::Step;
use super::plan_extractor::PlanExtractor;
use super::prompts;
use crate::error::{WorkforceError, WorkforceResult};
use crate::worker::{TaskContext, Worker};
use crate::{routing_span, step_span};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// How a worker was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Explicit,
    Planned,
    IntelligentFallback,
    FirstAgentFallback,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Explicit => "explicit",
            SelectionMethod::Planned => "planned",
            SelectionMethod::IntelligentFallback => "intelligent_fallback",
            SelectionMethod::FirstAgentFallback => "first_agent_fallback",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one executed plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub description: String,
    /// Worker that actually ran the step
    pub agent: String,
    pub selection_method: SelectionMethod,
    /// Worker the planner asked for, when it could not be used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_agent: Option<String>,
    pub result: String,
}

/// Outcome of `Workforce::execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Top-level agent: the explicit worker, the planner, or the fallback worker
    pub agent: String,
    pub result: String,
    #[serde(default)]
    pub subtasks: Vec<StepResult>,
    pub selection_method: SelectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Registry of workers plus an optional planner
pub struct Workforce {
    workers: Vec<Arc<dyn Worker>>,
    planner: Option<Arc<dyn Worker>>,
    selector: Box<dyn WorkerSelector>,
    extractor: PlanExtractor,
}

impl Workforce {
    /// Create a workforce scored with the default selector configuration
    pub fn new(
        workers: Vec<Arc<dyn Worker>>,
        planner: Option<Arc<dyn Worker>>,
    ) -> WorkforceResult<Self> {
        Self::with_selector_config(workers, planner, SelectorConfig::default())
    }

    pub fn with_selector_config(
        workers: Vec<Arc<dyn Worker>>,
        planner: Option<Arc<dyn Worker>>,
        config: SelectorConfig,
    ) -> WorkforceResult<Self> {
        config.validate().map_err(WorkforceError::invalid_input)?;
        Self::with_selector(workers, planner, Box::new(AgentSelector::new(config)))
    }

    /// Create a workforce with a custom selection strategy
    pub fn with_selector(
        workers: Vec<Arc<dyn Worker>>,
        planner: Option<Arc<dyn Worker>>,
        mut selector: Box<dyn WorkerSelector>,
    ) -> WorkforceResult<Self> {
        let mut seen = HashSet::new();
        for worker in &workers {
            if !seen.insert(worker.name().to_string()) {
                return Err(WorkforceError::duplicate_worker(worker.name()));
            }
        }

        selector.rebuild(&workers);

        Ok(Self {
            workers,
            planner,
            selector,
            extractor: PlanExtractor::new()?,
        })
    }

    /// Register a worker and rebuild the selection index
    pub fn add_worker(&mut self, worker: Arc<dyn Worker>) -> WorkforceResult<()> {
        if self.get_worker(worker.name()).is_some() {
            return Err(WorkforceError::duplicate_worker(worker.name()));
        }

        info!(worker = worker.name(), "Registering worker");
        self.workers.push(worker);
        self.selector.rebuild(&self.workers);
        Ok(())
    }

    /// Unregister a worker and rebuild the selection index
    pub fn remove_worker(&mut self, name: &str) -> Option<Arc<dyn Worker>> {
        let index = self.workers.iter().position(|w| w.name() == name)?;
        let removed = self.workers.remove(index);

        info!(worker = name, "Removed worker");
        self.selector.rebuild(&self.workers);
        Some(removed)
    }

    pub fn get_worker(&self, name: &str) -> Option<&Arc<dyn Worker>> {
        self.workers.iter().find(|w| w.name() == name)
    }

    /// Registered worker names, in registration order
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    pub fn planner(&self) -> Option<&Arc<dyn Worker>> {
        self.planner.as_ref()
    }

    /// Lexical ranking of all workers for a task, best first
    pub fn rank_workers(&self, task: &str) -> Vec<(String, f64)> {
        self.selector.get_ranked_agents(task)
    }

    /// Route and execute a task
    pub async fn execute(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        worker_name: Option<&str>,
    ) -> WorkforceResult<ExecutionResult> {
        let execution_id = Uuid::new_v4();
        let span = routing_span!(
            execution_id = %execution_id,
            workers = self.workers.len(),
            planner = self.planner.as_ref().map(|p| p.name()).unwrap_or("none")
        );

        self.route(task, context, worker_name).instrument(span).await
    }

    async fn route(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        worker_name: Option<&str>,
    ) -> WorkforceResult<ExecutionResult> {
        if self.workers.is_empty() {
            return Err(SelectionError::NoWorkers.into());
        }

        let empty = TaskContext::new();
        let context = context.unwrap_or(&empty);

        if let Some(name) = worker_name {
            match self.get_worker(name) {
                Some(worker) => {
                    info!(worker = name, selection_method = %SelectionMethod::Explicit, "Routing task");
                    let result = worker.run(task, context).await?;
                    return Ok(ExecutionResult {
                        agent: worker.name().to_string(),
                        result,
                        subtasks: Vec::new(),
                        selection_method: SelectionMethod::Explicit,
                        fallback_reason: None,
                    });
                }
                None => warn!(
                    worker = name,
                    "Requested worker is not registered, routing automatically"
                ),
            }
        }

        let Some(planner) = &self.planner else {
            return self
                .run_fallback(task, context, "No planner configured".to_string())
                .await;
        };

        let plan_prompt = prompts::plan_request(task, &self.workers);
        let planner_output = planner.run(&plan_prompt, context).await?;

        let plan = match self.extractor.parse_plan(&planner_output) {
            Ok(plan) if !plan.is_empty() => plan,
            Ok(_) => {
                return self
                    .run_fallback(
                        task,
                        context,
                        "JSON parsing failed: plan contained no subtasks".to_string(),
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .run_fallback(task, context, format!("JSON parsing failed: {e}"))
                    .await;
            }
        };

        info!(
            planner = planner.name(),
            steps = plan.len(),
            selection_method = %SelectionMethod::Planned,
            "Routing task"
        );

        let mut subtasks: Vec<StepResult> = Vec::with_capacity(plan.len());
        for step in plan {
            let (worker, selection_method, original_agent) = self.resolve_step(&step)?;
            let step_context = step_context(task, context, &subtasks);

            let span = step_span!(
                order = step.order,
                worker = worker.name(),
                selection_method = %selection_method
            );
            let result = worker
                .run(&step.description, &step_context)
                .instrument(span)
                .await?;

            subtasks.push(StepResult {
                description: step.description,
                agent: worker.name().to_string(),
                selection_method,
                original_agent,
                result,
            });
        }

        let synthesis_prompt = prompts::synthesis_request(task, &subtasks);
        let result = planner.run(&synthesis_prompt, context).await?;

        Ok(ExecutionResult {
            agent: planner.name().to_string(),
            result,
            subtasks,
            selection_method: SelectionMethod::Planned,
            fallback_reason: None,
        })
    }

    /// Pick the worker for one plan step
    fn resolve_step(
        &self,
        step: &Step,
    ) -> WorkforceResult<(Arc<dyn Worker>, SelectionMethod, Option<String>)> {
        if let Some(worker) = self.get_worker(&step.worker_name) {
            return Ok((worker.clone(), SelectionMethod::Planned, None));
        }

        match self.select_registered(&step.description, None) {
            Ok(worker) => {
                warn!(
                    planned = %step.worker_name,
                    selected = worker.name(),
                    selection_method = %SelectionMethod::IntelligentFallback,
                    "Planned worker is not registered"
                );
                Ok((
                    worker.clone(),
                    SelectionMethod::IntelligentFallback,
                    Some(step.worker_name.clone()),
                ))
            }
            Err(e) => {
                let worker = self.first_worker()?;
                warn!(
                    planned = %step.worker_name,
                    selected = worker.name(),
                    error = %e,
                    selection_method = %SelectionMethod::FirstAgentFallback,
                    "Planned worker is not registered and selection failed"
                );
                Ok((
                    worker.clone(),
                    SelectionMethod::FirstAgentFallback,
                    Some(step.worker_name.clone()),
                ))
            }
        }
    }

    /// Single-worker execution when no usable plan exists
    async fn run_fallback(
        &self,
        task: &str,
        context: &TaskContext,
        reason: String,
    ) -> WorkforceResult<ExecutionResult> {
        let (worker, selection_method, reason) = match self.select_registered(task, Some(context))
        {
            Ok(worker) => (worker, SelectionMethod::IntelligentFallback, reason),
            Err(e) => (
                self.first_worker()?,
                SelectionMethod::FirstAgentFallback,
                format!("{reason}; worker selection failed: {e}"),
            ),
        };

        warn!(
            worker = worker.name(),
            selection_method = %selection_method,
            reason = %reason,
            "Falling back to single-worker execution"
        );

        let result = worker.run(task, context).await?;
        Ok(ExecutionResult {
            agent: worker.name().to_string(),
            result,
            subtasks: Vec::new(),
            selection_method,
            fallback_reason: Some(reason),
        })
    }

    /// Ask the selector, rejecting answers outside the registry
    fn select_registered(
        &self,
        text: &str,
        context: Option<&TaskContext>,
    ) -> Result<&Arc<dyn Worker>, SelectionError> {
        let name = self.selector.select_best_agent(text, context)?;
        self.get_worker(&name)
            .ok_or(SelectionError::UnknownWorker(name))
    }

    fn first_worker(&self) -> Result<&Arc<dyn Worker>, SelectionError> {
        self.workers.first().ok_or(SelectionError::NoWorkers)
    }
}

impl fmt::Debug for Workforce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workforce")
            .field("workers", &self.worker_names())
            .field("planner", &self.planner.as_ref().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}

/// Caller context plus the original task and the results so far
fn step_context(task: &str, base: &TaskContext, completed: &[StepResult]) -> TaskContext {
    let previous: Vec<Value> = completed
        .iter()
        .map(|step| {
            json!({
                "description": step.description,
                "agent": step.agent,
                "result": step.result,
            })
        })
        .collect();

    let mut context = base.clone();
    context.insert("original_task".to_string(), Value::String(task.to_string()));
    context.insert("previous_results".to_string(), Value::Array(previous));
    context
}
