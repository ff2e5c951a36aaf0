//! Runtime Module - crew execution
//!
//! - `runner`: sequential state machine (`Pending` → `Running` → `Completed` | `Failed`)
//! - `context`: per-task context assembly from upstream outputs
//! - `output`: aggregation of stored outputs into the run result
//!
//! For the static structure, see the `crew` and `dag` modules.

mod context;
mod output;
mod runner;

pub use context::{assemble, AssembledContext, CONTEXT_HEADER, CONTEXT_SEPARATOR};
pub use output::CrewOutput;
pub use runner::{RunOptions, RunState, Runner};
