//! # Provider Abstraction Layer
//!
//! The agent-invocation boundary: given an agent's resolved profile, the
//! assembled task context and the agent's capabilities, a provider returns
//! free text or fails.
//!
//! ## Overview
//!
//! - [`Provider`] - core trait, one async operation
//! - [`OpenAiProvider`] - OpenAI-compatible chat completions (OpenAI, Ollama)
//! - [`MockProvider`] - queued responses, request recording, failure injection
//! - [`FnProvider`] - wraps a closure (tests, embedding)
//!
//! ## Creating Providers
//!
//! ```rust
//! use crewline::config::CrewConfig;
//! use crewline::provider::create_provider;
//!
//! let config = CrewConfig::default();
//! let mock = create_provider("mock", &config).unwrap();
//! assert_eq!(mock.name(), "mock");
//!
//! assert!(create_provider("invalid", &config).is_err());
//! ```
//!
//! ## Token Estimation
//!
//! ```rust
//! use crewline::provider::TokenUsage;
//!
//! let usage = TokenUsage::estimate(300, 150); // chars in, chars out
//! assert_eq!(usage.total_tokens, 150);
//! ```

mod function;
mod mock;
mod openai;

pub use function::FnProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::config::CrewConfig;
use crate::error::CrewError;

/// Average characters per token for mixed content (prose + code)
const CHARS_PER_TOKEN_MIXED: f32 = 3.0;

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Invokes an agent against one task
///
/// The runner treats the returned text as opaque. Providers do not retry;
/// any error (network, quota, malformed response, failing capability) ends
/// the run.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "openai", "mock")
    fn name(&self) -> &str;

    async fn invoke(&self, request: InvocationRequest) -> Result<InvocationResponse>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .finish()
    }
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Everything an agent receives for one task
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub task_id: Arc<str>,
    pub agent_id: Arc<str>,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Resolved task description followed by upstream outputs
    pub context: String,
    /// Shape hint for the answer (not enforced)
    pub expected_output: String,
    /// Per-agent model override
    pub model: Option<String>,
    pub capabilities: Vec<Arc<dyn Capability>>,
}

impl InvocationRequest {
    /// Agent persona (role, backstory, goal)
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}.", self.role);
        if !self.backstory.is_empty() {
            prompt.push(' ');
            prompt.push_str(&self.backstory);
        }
        prompt.push_str("\nYour personal goal is: ");
        prompt.push_str(&self.goal);
        prompt
    }

    /// Task instructions (context + expected output)
    pub fn user_prompt(&self) -> String {
        let mut prompt = format!("Current Task: {}", self.context);
        if !self.expected_output.is_empty() {
            prompt.push_str("\n\nThis is the expected criteria for your final answer: ");
            prompt.push_str(&self.expected_output);
            prompt.push_str(
                "\nYou MUST return the actual complete content as the final answer, not a summary.",
            );
        }
        prompt
    }

    /// Total prompt size in chars (for token estimates)
    pub fn prompt_len(&self) -> usize {
        self.system_prompt().chars().count() + self.user_prompt().chars().count()
    }

    pub fn capability(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.iter().find(|c| c.name() == name)
    }
}

/// Text produced by a provider
#[derive(Debug, Clone)]
pub struct InvocationResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// e.g. "stop", "length"
    pub stop_reason: Option<String>,
}

impl InvocationResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            stop_reason: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_stop_reason(mut self, reason: impl Into<String>) -> Self {
        self.stop_reason = Some(reason.into());
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate usage from text lengths when the backend reports none
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(
            self.prompt_tokens + other.prompt_tokens,
            self.completion_tokens + other.completion_tokens,
        )
    }
}

impl std::iter::Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, u| acc + u)
    }
}

// ============================================================================
// PROVIDER FACTORY
// ============================================================================

/// Create a provider by name
///
/// | Name | Description | Requires |
/// |------|-------------|----------|
/// | `openai` | OpenAI chat completions | `OPENAI_API_KEY` or `api_keys.openai` |
/// | `ollama` | Local Ollama (OpenAI-compatible endpoint) | Ollama running |
/// | `mock` | Testing / dry runs | Nothing |
pub fn create_provider(
    name: &str,
    config: &CrewConfig,
) -> std::result::Result<Arc<dyn Provider>, CrewError> {
    match name.to_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockProvider::new())),
        "openai" => {
            let key = config.openai_key().ok_or_else(|| CrewError::MissingApiKey {
                provider: "openai".to_string(),
            })?;
            let mut provider = OpenAiProvider::openai(key);
            if let Some(url) = config.base_url() {
                provider = provider.with_base_url(url);
            }
            if let Some(model) = config.model() {
                provider = provider.with_model(model);
            }
            Ok(Arc::new(provider))
        }
        "ollama" => {
            let mut provider = OpenAiProvider::ollama();
            if let Some(url) = config.base_url() {
                provider = provider.with_base_url(url);
            }
            if let Some(model) = config.model() {
                provider = provider.with_model(model);
            }
            Ok(Arc::new(provider))
        }
        _ => Err(CrewError::ProviderNotConfigured {
            provider: name.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
