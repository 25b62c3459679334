//! Plan and step types
//!
//! A `Plan` is the validated, ordered form of a planner's decomposition. It
//! only lives for the duration of one `Workforce::execute` call.

use super::schema::PlanOutput;

/// A single unit of work assigned to a worker
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub description: String,
    pub worker_name: String,
    pub order: f64,
}

/// Ordered sequence of steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Build a plan from the planner's output document
    ///
    /// Subtasks without an explicit `order` take their 1-based list position.
    /// The sort is stable so equal orders keep their list position.
    pub fn from_output(output: PlanOutput) -> Self {
        let mut steps: Vec<Step> = output
            .subtasks
            .into_iter()
            .enumerate()
            .map(|(index, subtask)| Step {
                description: subtask.description,
                worker_name: subtask.agent,
                order: subtask.order.unwrap_or(index as f64 + 1.0),
            })
            .collect();

        steps.sort_by(|a, b| a.order.total_cmp(&b.order));
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl IntoIterator for Plan {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::schema::PlannedSubtask;

    fn subtask(description: &str, agent: &str, order: Option<f64>) -> PlannedSubtask {
        PlannedSubtask {
            description: description.to_string(),
            agent: agent.to_string(),
            order,
        }
    }

    #[test]
    fn test_steps_sorted_by_order() {
        let plan = Plan::from_output(PlanOutput {
            subtasks: vec![
                subtask("Write it up", "writer", Some(2.0)),
                subtask("Research it", "researcher", Some(1.0)),
            ],
        });

        let workers: Vec<&str> = plan.steps().iter().map(|s| s.worker_name.as_str()).collect();
        assert_eq!(workers, vec!["researcher", "writer"]);
    }

    #[test]
    fn test_missing_order_uses_position() {
        let plan = Plan::from_output(PlanOutput {
            subtasks: vec![
                subtask("First", "a", None),
                subtask("Second", "b", None),
                subtask("Third", "c", None),
            ],
        });

        let orders: Vec<f64> = plan.steps().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equal_orders_keep_list_position() {
        let plan = Plan::from_output(PlanOutput {
            subtasks: vec![
                subtask("Later", "c", Some(5.0)),
                subtask("Tie one", "a", Some(1.0)),
                subtask("Tie two", "b", Some(1.0)),
            ],
        });

        let workers: Vec<&str> = plan.steps().iter().map(|s| s.worker_name.as_str()).collect();
        assert_eq!(workers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fractional_orders_interleave() {
        let plan = Plan::from_output(PlanOutput {
            subtasks: vec![
                subtask("Second", "b", Some(2.0)),
                subtask("Between", "c", Some(1.5)),
                subtask("First", "a", Some(1.0)),
            ],
        });

        let workers: Vec<&str> = plan.steps().iter().map(|s| s.worker_name.as_str()).collect();
        assert_eq!(workers, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::from_output(PlanOutput { subtasks: vec![] });
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
