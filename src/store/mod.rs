//! Store Module - per-run task outputs
//!
//! Thread-safe, write-once storage for the outputs of one run.
//!
//! Key types:
//! - `OutputStore`: task id → output, rejects a second write
//! - `TaskOutput`: text produced by an agent for one task

mod outputs;

pub use outputs::{OutputStore, TaskOutput};
