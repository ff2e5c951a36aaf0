//! Event Module - audit trail of a crew run
//!
//! Key types:
//! - `Event`: envelope with id + timestamp + kind
//! - `EventKind`: crew-level and task-level variants
//! - `EventLog`: thread-safe, append-only log

mod log;

pub use log::{ContextSource, Event, EventKind, EventLog};
