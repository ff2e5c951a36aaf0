//! Execution plan - ordering check + index arena

use std::collections::HashMap;
use std::sync::Arc;

use crate::crew::{Agent, Crew, Task};
use crate::error::{CrewError, Result};

/// One task with its agent and upstream indices resolved
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub task: Arc<Task>,
    pub agent: Arc<Agent>,
    /// Index into the plan of every `context` entry, in declared order
    pub upstream: Vec<usize>,
}

/// Validated step list (index = execution position)
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Check dependency ordering and bind every task to its agent.
    ///
    /// A dependency must name a task declared earlier. Unknown ids,
    /// self-references and forward references all fail with
    /// [`CrewError::DependencyOrder`], reported for the first offending
    /// task in declared order. Duplicate entries are kept.
    pub fn build(crew: &Crew) -> Result<Self> {
        let agents: HashMap<&str, &Arc<Agent>> =
            crew.agents().iter().map(|a| (a.id(), a)).collect();
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(crew.tasks().len());
        let mut steps = Vec::with_capacity(crew.tasks().len());

        for (index, task) in crew.tasks().iter().enumerate() {
            let upstream = task
                .dependencies()
                .iter()
                .map(|dep| {
                    seen.get(dep.as_ref())
                        .copied()
                        .ok_or_else(|| CrewError::DependencyOrder {
                            task_id: task.id().to_string(),
                            dependency: dep.to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let agent = agents
                .get(task.agent_id())
                .ok_or_else(|| CrewError::UnknownAgent {
                    task_id: task.id().to_string(),
                    agent_id: task.agent_id().to_string(),
                })?;

            steps.push(PlanStep {
                task: Arc::clone(task),
                agent: Arc::clone(agent),
                upstream,
            });
            seen.insert(task.id(), index);
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Task ids in execution order
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.task.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        Agent::new("a", "A", "g")
    }

    #[test]
    fn keeps_declared_order_and_indices() {
        let crew = Crew::builder()
            .agent(agent())
            .task(Task::new("script", "a", "d"))
            .task(Task::new("thumbnails", "a", "d").depends_on("script"))
            .task(
                Task::new("review", "a", "d")
                    .depends_on("script")
                    .depends_on("thumbnails"),
            )
            .build()
            .unwrap();
        let plan = ExecutionPlan::build(&crew).unwrap();
        assert_eq!(
            plan.order().collect::<Vec<_>>(),
            vec!["script", "thumbnails", "review"]
        );
        assert_eq!(plan.steps()[2].upstream, vec![0, 1]);
        assert_eq!(plan.steps()[0].agent.id(), "a");
    }

    #[test]
    fn forward_reference_fails() {
        let crew = Crew::builder()
            .agent(agent())
            .task(Task::new("thumbnails", "a", "d").depends_on("script"))
            .task(Task::new("script", "a", "d"))
            .build()
            .unwrap();
        match ExecutionPlan::build(&crew).unwrap_err() {
            CrewError::DependencyOrder {
                task_id,
                dependency,
            } => {
                assert_eq!(task_id, "thumbnails");
                assert_eq!(dependency, "script");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_and_self_references_fail() {
        let unknown = Crew::builder()
            .agent(agent())
            .task(Task::new("t", "a", "d").depends_on("ghost"))
            .build()
            .unwrap();
        assert!(matches!(
            ExecutionPlan::build(&unknown),
            Err(CrewError::DependencyOrder { .. })
        ));

        let own = Crew::builder()
            .agent(agent())
            .task(Task::new("t", "a", "d").depends_on("t"))
            .build()
            .unwrap();
        assert!(matches!(
            ExecutionPlan::build(&own),
            Err(CrewError::DependencyOrder { .. })
        ));
    }

    #[test]
    fn duplicate_dependencies_are_kept() {
        let crew = Crew::builder()
            .agent(agent())
            .task(Task::new("one", "a", "d"))
            .task(Task::new("two", "a", "d").depends_on("one").depends_on("one"))
            .build()
            .unwrap();
        let plan = ExecutionPlan::build(&crew).unwrap();
        assert_eq!(plan.steps()[1].upstream, vec![0, 0]);
    }
}
