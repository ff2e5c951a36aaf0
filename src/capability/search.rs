//! `web_search` capability backed by the DuckDuckGo instant answer API
//!
//! No API key is needed. The answer is the abstract (when DuckDuckGo has
//! one) followed by related topics, one per line.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::Capability;

const DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

/// Maximum related topics included in one answer
const MAX_TOPICS: usize = 8;

/// DuckDuckGo search capability
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl WebSearch {
    pub fn new() -> Self {
        Self::with_endpoint(DUCKDUCKGO_API_URL)
    }

    /// Point at a different endpoint (mirrors, tests)
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn request_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .with_context(|| format!("invalid search endpoint '{}'", self.endpoint))
    }
}

impl Default for WebSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web (DuckDuckGo) and return a short text summary of the results"
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        let url = self.request_url(query)?;
        tracing::debug!(capability = "web_search", %query, "Searching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search returned HTTP {}", status);
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .context("failed to parse search response")?;

        let text = answer.to_text(MAX_TOPICS);
        if text.is_empty() {
            anyhow::bail!("no results for '{}'", query);
        }
        Ok(text)
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn flatten<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Self::Topic { text, first_url } => out.push((text, first_url)),
            Self::Group { topics } => topics.iter().for_each(|t| t.flatten(out)),
        }
    }
}

impl InstantAnswer {
    fn to_text(&self, max_topics: usize) -> String {
        let mut lines = Vec::new();

        if !self.abstract_text.is_empty() {
            if self.heading.is_empty() {
                lines.push(self.abstract_text.clone());
            } else {
                lines.push(format!("{}: {}", self.heading, self.abstract_text));
            }
            if !self.abstract_url.is_empty() {
                lines.push(format!("Source: {}", self.abstract_url));
            }
        }

        let mut topics = Vec::new();
        for topic in &self.related_topics {
            topic.flatten(&mut topics);
        }
        for (text, url) in topics.into_iter().take(max_topics) {
            if url.is_empty() {
                lines.push(format!("- {}", text));
            } else {
                lines.push(format!("- {} ({})", text, url));
            }
        }

        lines.join("\n")
    }
}
