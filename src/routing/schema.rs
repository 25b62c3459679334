//! Structured Output Schema for Planner Responses
//!
//! The planner is asked to answer with this shape. The derived JSON schema is
//! what the extractor validates candidates against, so a planner reply that
//! parses but lacks `subtasks` (or whose items lack `description`/`agent`) is
//! rejected before it ever becomes a `Plan`.
//!
//! `order` is read loosely: `1`, `1.0` and `"1"` all work. A value that is not
//! a finite number is dropped and the subtask keeps its list position.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Planner decomposition output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanOutput {
    /// Ordered subtasks, each assigned to a named worker
    pub subtasks: Vec<PlannedSubtask>,
}

/// A single subtask as proposed by the planner
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannedSubtask {
    /// What the assigned worker should do
    pub description: String,

    /// Name of the worker the planner wants to run this subtask
    pub agent: String,

    /// Execution order; missing or unreadable values take the list position
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Value>")]
    pub order: Option<f64>,
}

fn lenient_order<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(order_from_value))
}

fn order_from_value(value: &Value) -> Option<f64> {
    let order = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    order.filter(|order| order.is_finite())
}

impl PlanOutput {
    /// Generate the JSON schema for this structure
    pub fn json_schema() -> Result<serde_json::Value, serde_json::Error> {
        let schema = schemars::schema_for!(PlanOutput);
        serde_json::to_value(schema)
    }
}
