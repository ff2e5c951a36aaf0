//! Result aggregation - read stored outputs into a `CrewOutput`

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::dag::ExecutionPlan;
use crate::error::{CrewError, Result};
use crate::provider::TokenUsage;
use crate::store::{OutputStore, TaskOutput};

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    pub run_id: String,
    /// Output of the last declared task
    pub final_output: Arc<str>,
    /// Every task output, in execution order
    pub tasks: Vec<TaskOutput>,
    /// Summed over all tasks
    pub usage: TokenUsage,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl CrewOutput {
    /// Output of one task
    pub fn task(&self, task_id: &str) -> Option<&TaskOutput> {
        self.tasks.iter().find(|t| &*t.task_id == task_id)
    }

    pub fn final_output(&self) -> &str {
        &self.final_output
    }
}

/// Pure read of the store in plan order (no recomputation).
///
/// Called only after every step stored its output.
pub(crate) fn aggregate(
    run_id: String,
    plan: &ExecutionPlan,
    store: &OutputStore,
    duration: Duration,
) -> Result<CrewOutput> {
    let tasks = plan
        .steps()
        .iter()
        .map(|step| {
            store.get(step.task.id()).ok_or_else(|| CrewError::Invocation {
                task_id: step.task.id().to_string(),
                agent_id: step.agent.id().to_string(),
                reason: "no output recorded".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let final_output = tasks
        .last()
        .map(|t| Arc::clone(&t.raw))
        .ok_or(CrewError::EmptyCrew)?;
    let usage = tasks.iter().map(|t| t.usage).sum();

    Ok(CrewOutput {
        run_id,
        final_output,
        tasks,
        usage,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::{Agent, Crew, Task};

    fn plan() -> ExecutionPlan {
        let crew = Crew::builder()
            .agent(Agent::new("a", "A", "g"))
            .task(Task::new("one", "a", "d"))
            .task(Task::new("two", "a", "d").depends_on("one"))
            .build()
            .unwrap();
        ExecutionPlan::build(&crew).unwrap()
    }

    fn record(store: &OutputStore, task: &str, raw: &str, usage: TokenUsage) {
        store
            .record(TaskOutput::new(
                Arc::from(task),
                Arc::from("a"),
                raw,
                usage,
                Duration::from_millis(1),
            ))
            .unwrap();
    }

    #[test]
    fn final_output_is_last_task() {
        let store = OutputStore::new();
        record(&store, "one", "first", TokenUsage::new(1, 1));
        record(&store, "two", "second", TokenUsage::new(2, 2));

        let output = aggregate("run".into(), &plan(), &store, Duration::ZERO).unwrap();
        assert_eq!(output.final_output(), "second");
        assert_eq!(output.task("one").unwrap().as_str(), "first");
        assert_eq!(output.usage, TokenUsage::new(3, 3));
        let order: Vec<&str> = output.tasks.iter().map(|t| &*t.task_id).collect();
        assert_eq!(order, vec!["one", "two"]);
    }

    #[test]
    fn missing_output_is_an_error() {
        let store = OutputStore::new();
        record(&store, "one", "first", TokenUsage::default());
        assert!(aggregate("run".into(), &plan(), &store, Duration::ZERO).is_err());
    }
}
