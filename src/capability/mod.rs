//! # Capability Registry
//!
//! Named external actions an agent may use while working on a task
//! (e.g. web search). A capability takes a free-text query and returns free
//! text; how it fails (timeout, rate limit, no results) is its own business
//! and surfaces to the runner as an ordinary invocation failure.
//!
//! | Name | Implementation |
//! |------|----------------|
//! | `web_search` | [`WebSearch`] - DuckDuckGo instant answers |
//!
//! Agents receive `Arc<dyn Capability>` handles resolved from a
//! [`CapabilityRegistry`] at assembly time.

mod search;

pub use search::WebSearch;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

/// An external action invoked with a free-text query
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry name (e.g. "web_search")
    fn name(&self) -> &str;

    /// One-line description shown to the model and in `crewline capabilities`
    fn description(&self) -> &str;

    /// Run the capability
    async fn invoke(&self, query: &str) -> Result<String>;
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name())
            .finish()
    }
}

/// Name → capability lookup used when assembling agents
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in capability
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WebSearch::new()));
        registry
    }

    /// Add or replace a capability under its own name
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.entries
            .insert(capability.name().to_string(), capability);
    }

    /// Look up a capability by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).cloned()
    }

    /// Registered capabilities, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// Capability returning a fixed answer (tests, offline runs)
pub struct StaticCapability {
    name: String,
    description: String,
    answer: std::result::Result<String, String>,
    queries: Mutex<Vec<String>>,
}

impl StaticCapability {
    /// Always answers `answer`
    pub fn new(name: impl Into<String>, answer: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Static capability '{}'", name),
            name,
            answer: Ok(answer.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with `error`
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Failing capability '{}'", name),
            name,
            answer: Err(error.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Capability for StaticCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        self.queries.lock().push(query.to_string());
        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(e) => anyhow::bail!("{}: {}", self.name, e),
        }
    }
}
