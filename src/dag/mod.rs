//! DAG Module - execution plan for a crew
//!
//! Tasks run in declared order; `context` edges may only point backwards.
//! [`ExecutionPlan::build`] checks that ordering and turns the crew into an
//! index arena the runner walks front to back.

mod plan;

pub use plan::{ExecutionPlan, PlanStep};
