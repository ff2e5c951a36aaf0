//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - CREW-000-009: Crew file errors
//! - CREW-010-019: Assembly errors (agents, tasks, capabilities)
//! - CREW-020-029: Dependency ordering errors
//! - CREW-030-039: Parameter substitution errors
//! - CREW-040-049: Execution errors (invocation, timeout, cancellation)
//! - CREW-050-059: Provider and configuration errors
//! - CREW-090-099: IO / parse errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrewError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum CrewError {
    // ═══════════════════════════════════════════
    // CREW FILE ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[CREW-001] Invalid schema: expected '{expected}', got '{actual}'")]
    InvalidSchema { expected: String, actual: String },

    #[error("[CREW-002] Crew has no tasks")]
    EmptyCrew,

    #[error("[CREW-003] Invalid input '{raw}': {reason}")]
    InvalidInput { raw: String, reason: String },

    // ═══════════════════════════════════════════
    // ASSEMBLY ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[CREW-010] Duplicate agent id '{agent_id}'")]
    DuplicateAgent { agent_id: String },

    #[error("[CREW-011] Duplicate task id '{task_id}'")]
    DuplicateTask { task_id: String },

    #[error("[CREW-012] Task '{task_id}' is bound to unknown agent '{agent_id}'")]
    UnknownAgent { task_id: String, agent_id: String },

    #[error("[CREW-013] Agent '{agent_id}' references unknown capability '{capability}'")]
    UnknownCapability { agent_id: String, capability: String },

    #[error("[CREW-014] Agent '{agent_id}' allows delegation, which this runner does not support")]
    DelegationUnsupported { agent_id: String },

    #[error("[CREW-015] Invalid id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    // ═══════════════════════════════════════════
    // DEPENDENCY ORDER (020-029)
    // ═══════════════════════════════════════════
    #[error(
        "[CREW-020] Task '{task_id}' depends on '{dependency}', which is not declared before it"
    )]
    DependencyOrder { task_id: String, dependency: String },

    // ═══════════════════════════════════════════
    // PARAMETER SUBSTITUTION (030-039)
    // ═══════════════════════════════════════════
    #[error("[CREW-030] Missing parameter '{{{token}}}' in {location}")]
    MissingParameter { token: String, location: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[CREW-040] Task '{task_id}' failed (agent '{agent_id}'): {reason}")]
    Invocation {
        task_id: String,
        agent_id: String,
        reason: String,
    },

    #[error("[CREW-041] Task '{task_id}' timed out after {timeout_ms}ms")]
    TaskTimeout { task_id: String, timeout_ms: u64 },

    #[error("[CREW-042] Run cancelled after {completed} completed task(s)")]
    Cancelled { completed: usize },

    #[error("[CREW-043] Task '{task_id}' already has an output for this run")]
    AlreadyCompleted { task_id: String },

    // ═══════════════════════════════════════════
    // PROVIDER / CONFIG ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[CREW-050] Provider '{provider}' not available (known: mock, openai, ollama)")]
    ProviderNotConfigured { provider: String },

    #[error("[CREW-051] Missing API key for provider '{provider}'")]
    MissingApiKey { provider: String },

    #[error("[CREW-052] Configuration error: {reason}")]
    ConfigError { reason: String },

    // ═══════════════════════════════════════════
    // IO / PARSE (090-099)
    // ═══════════════════════════════════════════
    #[error("[CREW-090] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[CREW-091] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl CrewError {
    /// Task that failed, for task-level failures only
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Self::Invocation { task_id, .. } | Self::TaskTimeout { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Error code (e.g. "CREW-020")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSchema { .. } => "CREW-001",
            Self::EmptyCrew => "CREW-002",
            Self::InvalidInput { .. } => "CREW-003",
            Self::DuplicateAgent { .. } => "CREW-010",
            Self::DuplicateTask { .. } => "CREW-011",
            Self::UnknownAgent { .. } => "CREW-012",
            Self::UnknownCapability { .. } => "CREW-013",
            Self::DelegationUnsupported { .. } => "CREW-014",
            Self::InvalidId { .. } => "CREW-015",
            Self::DependencyOrder { .. } => "CREW-020",
            Self::MissingParameter { .. } => "CREW-030",
            Self::Invocation { .. } => "CREW-040",
            Self::TaskTimeout { .. } => "CREW-041",
            Self::Cancelled { .. } => "CREW-042",
            Self::AlreadyCompleted { .. } => "CREW-043",
            Self::ProviderNotConfigured { .. } => "CREW-050",
            Self::MissingApiKey { .. } => "CREW-051",
            Self::ConfigError { .. } => "CREW-052",
            Self::Io(_) => "CREW-090",
            Self::YamlParse(_) => "CREW-091",
        }
    }
}

impl FixSuggestion for CrewError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidSchema { .. } => Some("Use 'schema: crewline/crew@0.1' in the crew file"),
            Self::EmptyCrew => Some("Declare at least one task under tasks:"),
            Self::InvalidInput { .. } => Some("Pass inputs as -i key=value"),
            Self::DuplicateAgent { .. } => Some("Give every agent a unique id"),
            Self::DuplicateTask { .. } => Some("Give every task a unique id"),
            Self::UnknownAgent { .. } => Some("Declare the agent under agents: or fix the task's agent field"),
            Self::UnknownCapability { .. } => {
                Some("Run 'crewline capabilities' to list the registered capabilities")
            }
            Self::DelegationUnsupported { .. } => Some("Set allow_delegation: false"),
            Self::InvalidId { .. } => Some("Use snake_case or kebab-case ids (letters, digits, '_' or '-')"),
            Self::DependencyOrder { .. } => {
                Some("Declare dependencies before the tasks that list them in context:")
            }
            Self::MissingParameter { .. } => {
                Some("Pass the parameter with -i name=value or add it under inputs:")
            }
            Self::Invocation { .. } => Some("Check provider credentials and network access, then re-run"),
            Self::TaskTimeout { .. } => Some("Raise --timeout or run.task_timeout_secs"),
            Self::Cancelled { .. } => None,
            Self::AlreadyCompleted { .. } => Some("Start a new run instead of re-executing a task"),
            Self::ProviderNotConfigured { .. } => Some("Use --provider mock, openai or ollama"),
            Self::MissingApiKey { .. } => {
                Some("Set OPENAI_API_KEY or api_keys.openai in ~/.config/crewline/config.toml")
            }
            Self::ConfigError { .. } => Some("Check ~/.config/crewline/config.toml syntax"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_order_names_task_and_dependency() {
        let err = CrewError::DependencyOrder {
            task_id: "thumbnails".into(),
            dependency: "script".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CREW-020"));
        assert!(msg.contains("'thumbnails'"));
        assert!(msg.contains("'script'"));
    }

    #[test]
    fn missing_parameter_renders_braces() {
        let err = CrewError::MissingParameter {
            token: "query".into(),
            location: "task 'script' description".into(),
        };
        assert_eq!(
            err.to_string(),
            "[CREW-030] Missing parameter '{query}' in task 'script' description"
        );
    }

    #[test]
    fn failed_task_only_for_task_failures() {
        let invocation = CrewError::Invocation {
            task_id: "review".into(),
            agent_id: "reviewer".into(),
            reason: "quota".into(),
        };
        assert_eq!(invocation.failed_task(), Some("review"));

        let timeout = CrewError::TaskTimeout {
            task_id: "script".into(),
            timeout_ms: 10,
        };
        assert_eq!(timeout.failed_task(), Some("script"));

        assert_eq!(CrewError::EmptyCrew.failed_task(), None);
    }

    #[test]
    fn code_matches_message_prefix() {
        let errors = [
            CrewError::EmptyCrew,
            CrewError::Cancelled { completed: 1 },
            CrewError::DuplicateTask {
                task_id: "a".into(),
            },
        ];
        for err in errors {
            assert!(err.to_string().starts_with(&format!("[{}]", err.code())));
        }
    }

    #[test]
    fn every_user_error_has_a_suggestion() {
        assert!(CrewError::EmptyCrew.fix_suggestion().is_some());
        assert!(CrewError::Cancelled { completed: 0 }.fix_suggestion().is_none());
    }
}
