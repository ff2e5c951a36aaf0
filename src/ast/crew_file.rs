//! Crew file (YAML) → raw definitions

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CrewError, Result};
use crate::template::Parameters;

/// Supported crew file schema
pub const SCHEMA_V01: &str = "crewline/crew@0.1";

/// How tasks are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Process {
    /// One task at a time, in declared order
    #[default]
    Sequential,
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
        }
    }
}

/// Crew file parsed from YAML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrewFile {
    pub schema: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub process: Process,
    /// Default parameters; caller parameters override them
    #[serde(default)]
    pub inputs: Parameters,
    pub agents: Vec<AgentDef>,
    pub tasks: Vec<TaskDef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentDef {
    pub id: String,
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Model override for this agent
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskDef {
    pub id: String,
    pub agent: String,
    pub description: String,
    #[serde(default)]
    pub expected_output: String,
    /// Upstream tasks whose outputs feed this task, in order
    #[serde(default)]
    pub context: Vec<String>,
}

impl CrewFile {
    /// Parse and check the schema line
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CrewFile = serde_yaml::from_str(yaml)?;
        if file.schema != SCHEMA_V01 {
            return Err(CrewError::InvalidSchema {
                expected: SCHEMA_V01.to_string(),
                actual: file.schema,
            });
        }
        Ok(file)
    }

    /// Read a crew file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&yaml)
    }
}
