//! Planner framings
//!
//! The planner is an ordinary worker. What makes it plan or synthesize is the
//! text it is handed, built here. The caller context is not rendered here;
//! the planner worker receives it alongside the prompt.

use crate::worker::Worker;
use std::sync::Arc;

use super::workforce::StepResult;

/// Ask the planner to decompose `task` over the registered workers
pub fn plan_request(task: &str, workers: &[Arc<dyn Worker>]) -> String {
    let mut prompt = String::from(
        "Break the following task into subtasks and assign each one to the most suitable worker.\n",
    );

    prompt.push_str(&format!("\nTask: {task}\n"));

    prompt.push_str("\nAvailable workers:\n");
    for worker in workers {
        prompt.push_str(&format!("- {}: {}\n", worker.name(), worker.description()));
    }

    prompt.push_str(
        "\nRespond with JSON only, in exactly this format:\n\
         {\"subtasks\": [{\"description\": \"what to do\", \"agent\": \"worker name\", \"order\": 1}]}\n\
         Use only the worker names listed above. Order subtasks starting at 1.",
    );

    prompt
}

/// Ask the planner to merge subtask outputs into a final answer
pub fn synthesis_request(task: &str, subtasks: &[StepResult]) -> String {
    let mut prompt = String::from(
        "Synthesize the results of the following subtasks into a single, coherent response \
         to the original task.\n",
    );
    prompt.push_str(&format!("\nOriginal task: {task}\n"));

    for (index, step) in subtasks.iter().enumerate() {
        prompt.push_str(&format!(
            "\nSubtask {} ({}): {}\nResult:\n{}\n",
            index + 1,
            step.agent,
            step.description,
            step.result
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::workforce::SelectionMethod;
    use crate::testing::mocks::MockWorker;

    #[test]
    fn test_plan_request_lists_workers() {
        let workers: Vec<Arc<dyn Worker>> = vec![
            Arc::new(MockWorker::new("researcher", "Finds facts", "Research.")),
            Arc::new(MockWorker::new("writer", "Writes prose", "Write.")),
        ];

        let prompt = plan_request("Explain tides", &workers);
        assert!(prompt.contains("Task: Explain tides"));
        assert!(prompt.contains("- researcher: Finds facts"));
        assert!(prompt.contains("- writer: Writes prose"));
        assert!(prompt.contains("\"subtasks\""));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn test_synthesis_request_includes_results_in_order() {
        let subtasks = vec![
            StepResult {
                description: "Gather facts".to_string(),
                agent: "researcher".to_string(),
                selection_method: SelectionMethod::Planned,
                original_agent: None,
                result: "Tides follow the moon.".to_string(),
            },
            StepResult {
                description: "Write summary".to_string(),
                agent: "writer".to_string(),
                selection_method: SelectionMethod::Planned,
                original_agent: None,
                result: "A short summary.".to_string(),
            },
        ];

        let prompt = synthesis_request("Explain tides", &subtasks);
        let first = prompt.find("Tides follow the moon.").unwrap();
        let second = prompt.find("A short summary.").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Subtask 1 (researcher): Gather facts"));
    }
}
