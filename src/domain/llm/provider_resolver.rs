//! Resolution of model endpoints to provider instances

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use super::LlmProvider;
use crate::domain::DomainError;

/// Where a model call should go, as configured on a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmEndpoint {
    /// Named preset from configuration, takes precedence over the fields below
    pub config_id: Option<String>,

    /// OpenAI-compatible base URL including the version segment
    pub base_url: Option<String>,

    pub api_key: Option<String>,
}

impl LlmEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_id(mut self, config_id: impl Into<String>) -> Self {
        self.config_id = Some(config_id.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Resolves a node's endpoint settings to an LLM provider instance.
#[async_trait]
pub trait ProviderResolver: Send + Sync + Debug {
    async fn resolve(&self, endpoint: &LlmEndpoint) -> Result<Arc<dyn LlmProvider>, DomainError>;
}

/// A resolver that always returns the same provider.
#[derive(Debug)]
pub struct StaticProviderResolver {
    provider: Arc<dyn LlmProvider>,
}

impl StaticProviderResolver {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderResolver for StaticProviderResolver {
    async fn resolve(&self, _endpoint: &LlmEndpoint) -> Result<Arc<dyn LlmProvider>, DomainError> {
        Ok(self.provider.clone())
    }
}
