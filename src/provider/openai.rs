//! OpenAI-compatible chat completions provider
//!
//! Talks to `{base_url}/chat/completions`. Works with the OpenAI API and with
//! any server exposing the same surface (Ollama's `/v1`).
//!
//! An agent's capabilities are offered as function tools taking a single
//! `query` string. Tool calls are executed and fed back until the model
//! answers with text or the round limit is hit.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{InvocationRequest, InvocationResponse, Provider, TokenUsage};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

/// Max model ↔ tool round trips per invocation
const MAX_TOOL_ROUNDS: usize = 8;

pub struct OpenAiProvider {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiProvider {
    /// OpenAI API with a bearer key
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            name: "openai",
            client: reqwest::Client::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: Some(api_key.into()),
            model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }

    /// Local Ollama server (no key)
    pub fn ollama() -> Self {
        Self {
            name: "ollama",
            client: reqwest::Client::new(),
            base_url: OLLAMA_BASE_URL.to_string(),
            api_key: None,
            model: OLLAMA_DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_messages(request: &InvocationRequest) -> Vec<ChatMessage> {
        vec![
            ChatMessage::text("system", request.system_prompt()),
            ChatMessage::text("user", request.user_prompt()),
        ]
    }

    fn build_tools(request: &InvocationRequest) -> Vec<ToolSpec> {
        request
            .capabilities
            .iter()
            .map(|cap| ToolSpec {
                kind: "function",
                function: FunctionSpec {
                    name: cap.name().to_string(),
                    description: cap.description().to_string(),
                    parameters: json!({
                        "type": "object",
                        "properties": {
                            "query": { "type": "string", "description": "Free-text query" }
                        },
                        "required": ["query"]
                    }),
                },
            })
            .collect()
    }

    async fn complete(&self, payload: &ChatCompletionRequest<'_>) -> Result<ChatCompletionResponse> {
        let mut http = self.client.post(self.endpoint()).json(payload);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", self.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = self.name,
                status = %status,
                error = %error_text,
                "Chat completions API error"
            );
            anyhow::bail!("{} API error ({}): {}", self.name, status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", self.name))
    }

    /// Run one tool call against the request's capabilities
    async fn call_tool(request: &InvocationRequest, call: &ToolCall) -> Result<String> {
        let capability = request
            .capability(&call.function.name)
            .with_context(|| format!("Model called unknown tool '{}'", call.function.name))?;

        let args: Value = serde_json::from_str(&call.function.arguments)
            .with_context(|| format!("Invalid arguments for tool '{}'", call.function.name))?;
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .with_context(|| format!("Tool '{}' called without a query", call.function.name))?;

        tracing::debug!(
            task_id = %request.task_id,
            tool = %call.function.name,
            query,
            "Invoking capability"
        );
        capability
            .invoke(query)
            .await
            .with_context(|| format!("Capability '{}' failed", call.function.name))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn invoke(&self, request: InvocationRequest) -> Result<InvocationResponse> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let tools = Self::build_tools(&request);
        let mut messages = Self::build_messages(&request);
        let mut usage = TokenUsage::default();

        for round in 0..MAX_TOOL_ROUNDS {
            let payload = ChatCompletionRequest {
                model: &model,
                messages: &messages,
                tools: &tools,
            };

            tracing::debug!(
                provider = self.name,
                model = %model,
                task_id = %request.task_id,
                round,
                messages_count = messages.len(),
                "Sending chat completion request"
            );

            let response = self.complete(&payload).await?;
            if let Some(u) = response.usage {
                usage = usage + TokenUsage::new(u.prompt_tokens, u.completion_tokens);
            }

            let choice = response
                .choices
                .into_iter()
                .next()
                .context("Chat completion returned no choices")?;

            if choice.message.tool_calls.is_empty() {
                let content = choice.message.content.unwrap_or_default();
                if usage == TokenUsage::default() {
                    usage = TokenUsage::estimate(request.prompt_len(), content.chars().count());
                }
                let mut out = InvocationResponse::new(content).with_usage(usage);
                if let Some(reason) = choice.finish_reason {
                    out = out.with_stop_reason(reason);
                }
                return Ok(out);
            }

            let calls = choice.message.tool_calls.clone();
            messages.push(choice.message);
            for call in &calls {
                let result = Self::call_tool(&request, call).await?;
                messages.push(ChatMessage::tool_result(&call.id, result));
            }
        }

        anyhow::bail!(
            "No final answer after {} tool rounds for task '{}'",
            MAX_TOOL_ROUNDS,
            request.task_id
        )
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::tests::request;
    use super::*;
    use crate::capability::StaticCapability;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        })
    }

    #[test]
    fn defaults_per_backend() {
        assert_eq!(OpenAiProvider::openai("k").model(), OPENAI_DEFAULT_MODEL);
        assert_eq!(OpenAiProvider::ollama().name(), "ollama");
        let p = OpenAiProvider::ollama().with_base_url("http://host:1/v1/");
        assert_eq!(p.endpoint(), "http://host:1/v1/chat/completions");
    }

    #[test]
    fn tools_built_from_capabilities() {
        let mut req = request("t");
        req.capabilities = vec![Arc::new(StaticCapability::new("web_search", "x"))];
        let tools = OpenAiProvider::build_tools(&req);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "web_search");
        assert_eq!(tools[0].function.parameters["required"][0], "query");
    }

    #[tokio::test]
    async fn returns_message_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Roteiro pronto")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::openai("sk-test").with_base_url(server.uri());
        let response = provider.invoke(request("script")).await.unwrap();
        assert_eq!(response.content, "Roteiro pronto");
        assert_eq!(response.usage, TokenUsage::new(12, 3));
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn executes_tool_calls_then_answers() {
        let server = MockServer::start().await;
        // Second round: the request carries the tool result
        Mock::given(method("POST"))
            .and(body_string_contains("tool_call_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Com pesquisa")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "web_search", "arguments": "{\"query\":\"jogos 2020\"}" }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let search = Arc::new(StaticCapability::new("web_search", "The Last of Us Part II"));
        let mut req = request("script");
        req.capabilities = vec![search.clone()];

        let provider = OpenAiProvider::ollama().with_base_url(server.uri());
        let response = provider.invoke(req).await.unwrap();
        assert_eq!(response.content, "Com pesquisa");
        assert_eq!(search.queries(), vec!["jogos 2020"]);
    }

    #[tokio::test]
    async fn failing_capability_fails_invocation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "tool_calls": [{
                            "id": "call_1",
                            "function": { "name": "web_search", "arguments": "{\"query\":\"x\"}" }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let mut req = request("script");
        req.capabilities = vec![Arc::new(StaticCapability::failing("web_search", "rate limited"))];
        let provider = OpenAiProvider::ollama().with_base_url(server.uri());
        let err = provider.invoke(req).await.unwrap_err();
        assert!(format!("{:#}", err).contains("rate limited"));
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::openai("k").with_base_url(server.uri());
        let err = provider.invoke(request("t")).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("quota exceeded"));
    }
}
