//! Closure-backed provider

use anyhow::Result;
use async_trait::async_trait;

use super::{InvocationRequest, InvocationResponse, Provider, TokenUsage};

type InvokeFn = dyn Fn(&InvocationRequest) -> Result<String> + Send + Sync;

/// Provider whose answer is computed by a plain function
///
/// ```rust
/// use crewline::provider::FnProvider;
///
/// let upper = FnProvider::new("upper", |req| Ok(req.context.to_uppercase()));
/// ```
pub struct FnProvider {
    name: String,
    f: Box<InvokeFn>,
}

impl FnProvider {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&InvocationRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl Provider for FnProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: InvocationRequest) -> Result<InvocationResponse> {
        let content = (self.f)(&request)?;
        let usage = TokenUsage::estimate(request.prompt_len(), content.chars().count());
        Ok(InvocationResponse::new(content).with_usage(usage))
    }
}
