//! Crewline - sequential crew pipeline runner for AI agents (v0.1)
//!
//! A crew is a fixed set of agents and an ordered list of tasks. Each task
//! is bound to one agent and may list earlier tasks whose outputs become part
//! of its context. A run substitutes parameters, checks ordering, then
//! executes tasks one by one and returns the last task's output.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/        YAML → raw definitions (CrewFile)               │
//! │  crew/       Agent, Task, Crew, CrewBuilder                  │
//! │  template    {placeholder} substitution                      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  dag/        Ordering check → ExecutionPlan                  │
//! │  runtime/    Runner state machine, context, aggregation      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/      Write-once task outputs (DashMap)               │
//! │  event/      Append-only run log (EventLog, EventKind)       │
//! │  provider/   Agent invocation (mock, OpenAI-compatible)      │
//! │  capability/ Named external actions (web_search)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use crewline::{Agent, Crew, MockProvider, Parameters, Runner, Task};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let crew = Crew::builder()
//!     .agent(Agent::new("writer", "Writer", "Write about {query}"))
//!     .task(Task::new("draft", "writer", "Draft a script on {query}"))
//!     .task(Task::new("review", "writer", "Review the draft").depends_on("draft"))
//!     .build()
//!     .unwrap();
//!
//! let mut params = Parameters::new();
//! params.insert("query".into(), "Melhores jogos de 2020".into());
//!
//! let runner = Runner::new(crew, Arc::new(MockProvider::new()));
//! let output = runner.run(&params).await.unwrap();
//! assert_eq!(output.tasks.len(), 2);
//! # }
//! ```

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL
// ═══════════════════════════════════════════════════════════════
pub mod ast;
pub mod crew;
pub mod template;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER
// ═══════════════════════════════════════════════════════════════
pub mod dag;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER
// ═══════════════════════════════════════════════════════════════
pub mod capability;
pub mod event;
pub mod provider;
pub mod store;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

pub use error::{CrewError, FixSuggestion, Result};

pub use config::CrewConfig;

pub use ast::{CrewFile, Process};
pub use crew::{Agent, Crew, CrewBuilder, Task};
pub use template::{Parameters, Template};

pub use dag::ExecutionPlan;
pub use runtime::{CrewOutput, RunOptions, RunState, Runner};

pub use capability::{Capability, CapabilityRegistry, StaticCapability, WebSearch};
pub use event::{Event, EventKind, EventLog};
pub use provider::{create_provider, FnProvider, MockProvider, OpenAiProvider, Provider};
pub use store::{OutputStore, TaskOutput};
