//! EventLog - append-only run history
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: crew level (started/completed/failed/cancelled) and task level
//! - EventLog: thread-safe, cloneable handle

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One upstream output included in a task's context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextSource {
    pub task_id: Arc<str>,
    /// Length of the included output (chars)
    pub chars: usize,
}

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

/// All event types
///
/// Uses Arc<str> for task ids so events share the crew's id allocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // CREW LEVEL
    // ═══════════════════════════════════════════
    CrewStarted {
        run_id: String,
        crew: Option<String>,
        task_count: usize,
        /// Effective parameters (crew defaults merged with caller values)
        inputs: Value,
    },
    CrewCompleted {
        final_output: Arc<str>,
        total_duration_ms: u64,
    },
    CrewFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },
    CrewCancelled {
        completed: usize,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskStarted {
        task_id: Arc<str>,
        agent_id: Arc<str>,
    },
    /// Upstream outputs appended to the task description
    ContextAssembled {
        task_id: Arc<str>,
        sources: Vec<ContextSource>,
        total_chars: usize,
    },
    TaskCompleted {
        task_id: Arc<str>,
        output_len: usize,
        input_tokens: u32,
        output_tokens: u32,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },
}

impl EventKind {
    /// Task id for task-level events
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::ContextAssembled { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. } => Some(task_id),
            Self::CrewStarted { .. }
            | Self::CrewCompleted { .. }
            | Self::CrewFailed { .. }
            | Self::CrewCancelled { .. } => None,
        }
    }

    pub fn is_crew_event(&self) -> bool {
        self.task_id().is_none()
    }

    /// snake_case type name (matches the serialized `type` tag)
    pub fn name(&self) -> &'static str {
        match self {
            Self::CrewStarted { .. } => "crew_started",
            Self::CrewCompleted { .. } => "crew_completed",
            Self::CrewFailed { .. } => "crew_failed",
            Self::CrewCancelled { .. } => "crew_cancelled",
            Self::TaskStarted { .. } => "task_started",
            Self::ContextAssembled { .. } => "context_assembled",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskFailed { .. } => "task_failed",
        }
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (returns its id)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };
        self.events.write().push(event);
        id
    }

    /// All events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Zero-copy access to events via callback
    ///
    /// Holds the read lock for the duration of the callback.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    /// Events of one task
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.task_id() == Some(task_id))
                .cloned()
                .collect()
        })
    }

    /// Crew-level events only
    pub fn crew_events(&self) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.is_crew_event())
                .cloned()
                .collect()
        })
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
