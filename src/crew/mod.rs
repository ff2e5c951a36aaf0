//! Crew - agents, tasks and the process that runs them
//!
//! A [`Crew`] is assembled once (from a crew file or with [`CrewBuilder`])
//! and is read-only afterwards. Assembly checks structure: unique ids, every
//! task bound to a declared agent, known capabilities, no delegation.
//! Dependency ordering is checked by [`crate::dag`] when a run starts.

mod agent;
mod resolve;
mod task;

pub use agent::Agent;
pub use resolve::{ResolvedAgent, ResolvedCrew, ResolvedTask};
pub use task::Task;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{CrewFile, Process};
use crate::capability::CapabilityRegistry;
use crate::error::{CrewError, Result};
use crate::template::Parameters;

/// Agent and task ids: letters, digits, '_' and '-', starting alphanumeric
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// Validate an agent or task id
pub fn validate_id(id: &str) -> Result<()> {
    if ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(CrewError::InvalidId {
            id: id.to_string(),
            reason: "expected letters, digits, '_' or '-' (starting with a letter or digit)"
                .to_string(),
        })
    }
}

/// Assembled crew (read-only)
#[derive(Debug, Clone)]
pub struct Crew {
    name: Option<String>,
    process: Process,
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Arc<Task>>,
    defaults: Parameters,
}

impl Crew {
    pub fn builder() -> CrewBuilder {
        CrewBuilder::default()
    }

    /// Assemble from a parsed crew file, resolving capability names
    pub fn from_file(file: CrewFile, registry: &CapabilityRegistry) -> Result<Self> {
        let mut builder = Crew::builder().process(file.process);
        if let Some(name) = file.name {
            builder = builder.name(name);
        }
        for (key, value) in file.inputs {
            builder = builder.default_input(key, value);
        }

        for def in file.agents {
            let capabilities = def
                .capabilities
                .iter()
                .map(|name| {
                    registry
                        .get(name)
                        .ok_or_else(|| CrewError::UnknownCapability {
                            agent_id: def.id.clone(),
                            capability: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut agent = Agent::new(def.id, def.role, def.goal)
                .backstory(def.backstory)
                .capabilities(capabilities)
                .allow_delegation(def.allow_delegation)
                .verbose(def.verbose);
            if let Some(model) = def.model {
                agent = agent.model(model);
            }
            builder = builder.agent(agent);
        }

        for def in file.tasks {
            let mut task =
                Task::new(def.id, def.agent, def.description).expected_output(def.expected_output);
            for dep in def.context {
                task = task.depends_on(dep);
            }
            builder = builder.task(task);
        }

        builder.build()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn agent(&self, id: &str) -> Option<&Arc<Agent>> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Default parameters declared by the crew
    pub fn default_inputs(&self) -> &Parameters {
        &self.defaults
    }

    /// Crew defaults overridden key by key with `params`
    pub fn merged_inputs(&self, params: &Parameters) -> Parameters {
        let mut merged = self.defaults.clone();
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Every placeholder used by any agent or task template
    pub fn required_parameters(&self) -> BTreeSet<String> {
        let agent_templates = self.agents.iter().flat_map(|a| a.templates());
        let task_templates = self.tasks.iter().flat_map(|t| t.templates());
        agent_templates
            .chain(task_templates)
            .flat_map(|(_, template)| template.placeholders())
            .map(str::to_string)
            .collect()
    }
}

/// Builder for [`Crew`]
#[derive(Debug, Default)]
pub struct CrewBuilder {
    name: Option<String>,
    process: Process,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    defaults: Parameters,
}

impl CrewBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    /// Append a task (declared order is execution order)
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn default_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(CrewError::EmptyCrew);
        }

        let mut agent_ids = HashSet::with_capacity(self.agents.len());
        for agent in &self.agents {
            validate_id(agent.id())?;
            if !agent_ids.insert(agent.id()) {
                return Err(CrewError::DuplicateAgent {
                    agent_id: agent.id().to_string(),
                });
            }
            if agent.delegation_allowed() {
                return Err(CrewError::DelegationUnsupported {
                    agent_id: agent.id().to_string(),
                });
            }
        }

        let mut task_ids = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            validate_id(task.id())?;
            if !task_ids.insert(task.id()) {
                return Err(CrewError::DuplicateTask {
                    task_id: task.id().to_string(),
                });
            }
            if !agent_ids.contains(task.agent_id()) {
                return Err(CrewError::UnknownAgent {
                    task_id: task.id().to_string(),
                    agent_id: task.agent_id().to_string(),
                });
            }
        }

        Ok(Crew {
            name: self.name,
            process: self.process,
            agents: self.agents.into_iter().map(Arc::new).collect(),
            tasks: self.tasks.into_iter().map(Arc::new).collect(),
            defaults: self.defaults,
        })
    }
}
