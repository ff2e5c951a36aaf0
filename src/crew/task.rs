//! Task - one unit of work bound to one agent

use std::sync::Arc;

use crate::template::Template;

/// Declared unit of work.
///
/// `context` lists upstream task ids; their outputs are appended to this
/// task's description in the listed order.
#[derive(Debug, Clone)]
pub struct Task {
    id: Arc<str>,
    agent: Arc<str>,
    description: Template,
    expected_output: Template,
    context: Vec<Arc<str>>,
}

impl Task {
    pub fn new(
        id: impl Into<Arc<str>>,
        agent: impl Into<Arc<str>>,
        description: impl Into<Template>,
    ) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            description: description.into(),
            expected_output: Template::parse(""),
            context: Vec::new(),
        }
    }

    /// Shape the result should have (a hint for the agent, not enforced)
    pub fn expected_output(mut self, expected: impl Into<Template>) -> Self {
        self.expected_output = expected.into();
        self
    }

    /// Append an upstream dependency
    pub fn depends_on(mut self, task_id: impl Into<Arc<str>>) -> Self {
        self.context.push(task_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> &Arc<str> {
        &self.id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent
    }

    pub fn description_template(&self) -> &Template {
        &self.description
    }

    pub fn expected_output_template(&self) -> &Template {
        &self.expected_output
    }

    pub fn dependencies(&self) -> &[Arc<str>] {
        &self.context
    }

    pub(crate) fn templates(&self) -> [(&'static str, &Template); 2] {
        [
            ("description", &self.description),
            ("expected_output", &self.expected_output),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depends_on_keeps_declared_order() {
        let task = Task::new("review", "reviewer", "Review")
            .depends_on("script")
            .depends_on("thumbnails");
        let deps: Vec<&str> = task.dependencies().iter().map(|d| d.as_ref()).collect();
        assert_eq!(deps, vec!["script", "thumbnails"]);
    }

    #[test]
    fn expected_output_defaults_to_empty() {
        let task = Task::new("t", "a", "d");
        assert_eq!(task.expected_output_template().source(), "");
        assert_eq!(task.agent_id(), "a");
    }
}
