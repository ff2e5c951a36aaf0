//! Crew file parsing structures
//!
//! A crew file declares agents, tasks and their wiring. Parsing only checks
//! YAML shape; assembly rules live in [`crate::crew`] and ordering rules in
//! [`crate::dag`].

mod crew_file;

pub use crew_file::{AgentDef, CrewFile, Process, TaskDef, SCHEMA_V01};
