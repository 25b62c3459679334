//! Task Routing
//!
//! Three layers decide which worker handles what:
//!
//! ## Plan extraction (plan_extractor.rs)
//!
//! Recovers a schema-valid JSON document from free planner text, tolerating
//! prose, markdown fences and truncation, and turns it into an ordered `Plan`.
//!
//! ## Lexical selection (agent_selector.rs)
//!
//! Scores registered workers against a task from their descriptions and
//! directives. Used whenever no trustworthy plan names a worker.
//!
//! ## Workforce (workforce.rs)
//!
//! The routing state machine: explicit worker, planned decomposition, or
//! layered fallback, followed by step execution and synthesis.

pub mod agent_selector;
pub mod plan;
pub mod plan_extractor;
pub mod prompts;
pub mod schema;
pub mod workforce;

pub use agent_selector::{
    default_capability_markers, AgentSelector, CapabilityMarker, ScoreBreakdown, ScoringWeights,
    SelectionError, SelectorConfig, WorkerProfile, WorkerSelector,
};
pub use plan::{Plan, Step};
pub use plan_extractor::{
    extract_json, ExtractionSchema, ExtractionStrategy, ParsingError, PlanExtractor, SchemaError,
};
pub use schema::{PlanOutput, PlannedSubtask};
pub use workforce::{ExecutionResult, SelectionMethod, StepResult, Workforce};
