//! Endpoint-based provider resolution

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::openai::{DEFAULT_OPENAI_BASE_URL, OpenAiProvider};
use crate::domain::{DomainError, LlmEndpoint, LlmProvider, ProviderResolver};
use crate::infrastructure::http_client::HttpClientTrait;

/// Base URL and key of a named endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPreset {
    pub base_url: String,
    pub api_key: String,
}

/// Builds an OpenAI-compatible provider for each endpoint
///
/// A node's `config_id` selects a preset when one with that name exists.
/// Otherwise the node's own URL and key apply, falling back to the defaults.
#[derive(Debug)]
pub struct EndpointProviderResolver {
    client: Arc<dyn HttpClientTrait>,
    default_base_url: String,
    default_api_key: String,
    presets: HashMap<String, EndpointPreset>,
}

impl EndpointProviderResolver {
    pub fn new(client: Arc<dyn HttpClientTrait>) -> Self {
        Self {
            client,
            default_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            default_api_key: String::new(),
            presets: HashMap::new(),
        }
    }

    pub fn with_defaults(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.default_base_url = base_url.into();
        self.default_api_key = api_key.into();
        self
    }

    pub fn with_preset(mut self, id: impl Into<String>, preset: EndpointPreset) -> Self {
        self.presets.insert(id.into(), preset);
        self
    }

    pub fn with_presets(mut self, presets: HashMap<String, EndpointPreset>) -> Self {
        self.presets.extend(presets);
        self
    }

    /// Base URL and key an endpoint resolves to
    pub fn target(&self, endpoint: &LlmEndpoint) -> (String, String) {
        let preset = endpoint
            .config_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| self.presets.get(id))
            .filter(|preset| !preset.base_url.is_empty());

        if let Some(preset) = preset {
            return (preset.base_url.clone(), preset.api_key.clone());
        }

        let base_url = non_empty(endpoint.base_url.as_deref()).unwrap_or(&self.default_base_url);
        let api_key = non_empty(endpoint.api_key.as_deref()).unwrap_or(&self.default_api_key);

        (base_url.to_string(), api_key.to_string())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl ProviderResolver for EndpointProviderResolver {
    async fn resolve(&self, endpoint: &LlmEndpoint) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let (base_url, api_key) = self.target(endpoint);

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(DomainError::configuration(format!(
                "Invalid model endpoint URL '{}'",
                base_url
            )));
        }

        debug!(base_url = %base_url, config_id = ?endpoint.config_id, "Resolved model endpoint");

        Ok(Arc::new(OpenAiProvider::with_base_url(
            self.client.clone(),
            api_key,
            base_url,
        )))
    }
}
