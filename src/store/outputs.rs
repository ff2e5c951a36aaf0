//! OutputStore - write-once task outputs with DashMap

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Serialize, Serializer};

use crate::error::{CrewError, Result};
use crate::provider::TokenUsage;

/// Text produced by one agent for one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task_id: Arc<str>,
    pub agent_id: Arc<str>,
    /// Raw output (Arc for O(1) cloning into downstream context)
    pub raw: Arc<str>,
    pub usage: TokenUsage,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl TaskOutput {
    pub fn new(
        task_id: Arc<str>,
        agent_id: Arc<str>,
        raw: impl Into<Arc<str>>,
        usage: TokenUsage,
        duration: Duration,
    ) -> Self {
        Self {
            task_id,
            agent_id,
            raw: raw.into(),
            usage,
            duration,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Task outputs for a single run
///
/// Each task id can be written once; outputs are never mutated afterwards.
#[derive(Clone, Default)]
pub struct OutputStore {
    outputs: Arc<DashMap<Arc<str>, TaskOutput>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's output, failing if one already exists
    pub fn record(&self, output: TaskOutput) -> Result<()> {
        match self.outputs.entry(Arc::clone(&output.task_id)) {
            Entry::Occupied(_) => Err(CrewError::AlreadyCompleted {
                task_id: output.task_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(output);
                Ok(())
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<TaskOutput> {
        self.outputs.get(task_id).map(|r| r.value().clone())
    }

    /// Output text only (shared, no copy)
    pub fn text(&self, task_id: &str) -> Option<Arc<str>> {
        self.outputs.get(task_id).map(|r| Arc::clone(&r.raw))
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.outputs.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl std::fmt::Debug for OutputStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStore")
            .field("len", &self.outputs.len())
            .finish()
    }
}
