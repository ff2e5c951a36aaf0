//! Parameter substitution over a whole crew

use std::sync::Arc;

use super::Crew;
use crate::error::Result;
use crate::template::Parameters;

/// Agent text after substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAgent {
    pub id: Arc<str>,
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

/// Task text after substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    pub id: Arc<str>,
    pub agent: Arc<str>,
    pub description: String,
    pub expected_output: String,
}

/// Every template of a crew filled for one run (declared order kept)
#[derive(Debug, Clone)]
pub struct ResolvedCrew {
    pub agents: Vec<ResolvedAgent>,
    pub tasks: Vec<ResolvedTask>,
}

impl ResolvedCrew {
    pub fn agent(&self, id: &str) -> Option<&ResolvedAgent> {
        self.agents.iter().find(|a| &*a.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&ResolvedTask> {
        self.tasks.iter().find(|t| &*t.id == id)
    }
}

impl Crew {
    /// Fill every agent and task template from `params`.
    ///
    /// `params` is used as given; merge crew defaults first with
    /// [`Crew::merged_inputs`]. Agents are resolved before tasks, each in
    /// declared order, and the first missing placeholder is reported. The
    /// crew itself is untouched.
    pub fn resolve(&self, params: &Parameters) -> Result<ResolvedCrew> {
        let agents = self
            .agents()
            .iter()
            .map(|agent| {
                let [role, goal, backstory] = agent
                    .templates()
                    .map(|(field, t)| t.resolve(params, &format!("agent '{}' {}", agent.id(), field)));
                Ok(ResolvedAgent {
                    id: agent.id_arc().clone(),
                    role: role?,
                    goal: goal?,
                    backstory: backstory?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tasks = self
            .tasks()
            .iter()
            .map(|task| {
                let [description, expected_output] = task
                    .templates()
                    .map(|(field, t)| t.resolve(params, &format!("task '{}' {}", task.id(), field)));
                Ok(ResolvedTask {
                    id: task.id_arc().clone(),
                    agent: Arc::from(task.agent_id()),
                    description: description?,
                    expected_output: expected_output?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedCrew { agents, tasks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::{Agent, Task};
    use crate::error::CrewError;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn crew() -> Crew {
        Crew::builder()
            .agent(
                Agent::new("writer", "Roteirista", "Roteiro sobre {query}")
                    .backstory("Especialista em {query}"),
            )
            .task(
                Task::new("script", "writer", "Escreva sobre {query}")
                    .expected_output("Roteiro de {minutes} minutos"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn resolves_agents_and_tasks() {
        let resolved = crew()
            .resolve(&params(&[("query", "jogos"), ("minutes", "10")]))
            .unwrap();
        let agent = resolved.agent("writer").unwrap();
        assert_eq!(agent.goal, "Roteiro sobre jogos");
        assert_eq!(agent.backstory, "Especialista em jogos");
        let task = resolved.task("script").unwrap();
        assert_eq!(task.description, "Escreva sobre jogos");
        assert_eq!(task.expected_output, "Roteiro de 10 minutos");
        assert_eq!(&*task.agent, "writer");
    }

    #[test]
    fn agent_templates_fail_before_task_templates() {
        let err = crew().resolve(&Parameters::new()).unwrap_err();
        match err {
            CrewError::MissingParameter { token, location } => {
                assert_eq!(token, "query");
                assert_eq!(location, "agent 'writer' goal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_task_parameter_names_location() {
        let err = crew().resolve(&params(&[("query", "x")])).unwrap_err();
        match err {
            CrewError::MissingParameter { token, location } => {
                assert_eq!(token, "minutes");
                assert_eq!(location, "task 'script' expected_output");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn crew_is_reusable_across_parameter_sets() {
        let crew = crew();
        let a = crew
            .resolve(&params(&[("query", "a"), ("minutes", "1")]))
            .unwrap();
        let b = crew
            .resolve(&params(&[("query", "b"), ("minutes", "1")]))
            .unwrap();
        assert_eq!(a.tasks[0].description, "Escreva sobre a");
        assert_eq!(b.tasks[0].description, "Escreva sobre b");
        assert_eq!(crew.tasks()[0].description_template().source(), "Escreva sobre {query}");
    }
}
