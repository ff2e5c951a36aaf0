//! Agent - a named role with a goal, a profile and capabilities

use std::sync::Arc;

use crate::capability::Capability;
use crate::template::Template;

/// A role that can be invoked to produce text.
///
/// Capabilities are fixed once the agent is constructed: builder methods
/// consume the agent, and a crew only hands out shared references.
#[derive(Debug, Clone)]
pub struct Agent {
    id: Arc<str>,
    role: Template,
    goal: Template,
    backstory: Template,
    capabilities: Arc<[Arc<dyn Capability>]>,
    allow_delegation: bool,
    verbose: bool,
    model: Option<String>,
}

impl Agent {
    pub fn new(id: impl Into<Arc<str>>, role: impl Into<Template>, goal: impl Into<Template>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: Template::parse(""),
            capabilities: Arc::from(Vec::new()),
            allow_delegation: false,
            verbose: false,
            model: None,
        }
    }

    pub fn backstory(mut self, backstory: impl Into<Template>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Set the capability list (order kept)
    pub fn capabilities(mut self, capabilities: Vec<Arc<dyn Capability>>) -> Self {
        self.capabilities = Arc::from(capabilities);
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> &Arc<str> {
        &self.id
    }

    pub fn role_template(&self) -> &Template {
        &self.role
    }

    pub fn goal_template(&self) -> &Template {
        &self.goal
    }

    pub fn backstory_template(&self) -> &Template {
        &self.backstory
    }

    pub fn capability_handles(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    pub fn delegation_allowed(&self) -> bool {
        self.allow_delegation
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn model_override(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub(crate) fn templates(&self) -> [(&'static str, &Template); 3] {
        [
            ("role", &self.role),
            ("goal", &self.goal),
            ("backstory", &self.backstory),
        ]
    }
}
