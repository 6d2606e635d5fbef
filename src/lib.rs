//! PMP Workflow Engine
//!
//! Executes user-defined workflows: directed graphs of typed nodes
//! (language model calls, knowledge-base retrieval, sandboxed scripts,
//! conditional branching, outbound HTTP, variables and templates).
//! - `domain`: the workflow model, collaborator traits and errors
//! - `infrastructure`: the engine, node executors and their collaborators
//! - `api` / `cli`: the HTTP surface and command line

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::collections::BTreeMap;
use std::sync::Arc;

use api::state::AppState;
use config::StorageBackend;
use domain::{KnowledgeBaseRegistry, RetrievalProvider, Storage, Workflow};
use infrastructure::{
    http_client::{HttpClient, HttpClientTrait},
    knowledge_base::{InMemoryKnowledgeBaseRegistry, InMemoryRetrievalProvider},
    llm::EndpointProviderResolver,
    sandbox::RhaiSandbox,
    services::WorkflowService,
    storage::{FileStorage, InMemoryStorage},
    workflow::{EngineSettings, WorkflowEngine},
};
use tracing::info;

/// Application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let service = create_workflow_service(config).await?;

    let presets: BTreeMap<String, String> = config
        .llm
        .presets
        .iter()
        .map(|(name, preset)| (name.clone(), preset.base_url.clone()))
        .collect();

    Ok(AppState::new(Arc::new(service)).with_llm_presets(presets))
}

/// Definition store plus engine, wired from configuration
pub async fn create_workflow_service(config: &AppConfig) -> anyhow::Result<WorkflowService> {
    let storage = create_storage(config).await?;
    let engine = create_engine(config).await?;

    Ok(WorkflowService::new(storage, Arc::new(engine)))
}

pub async fn create_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage<Workflow>>> {
    let storage: Arc<dyn Storage<Workflow>> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory workflow storage");
            Arc::new(InMemoryStorage::<Workflow>::new())
        }
        StorageBackend::File => {
            let storage = FileStorage::<Workflow>::open(config.storage.workflows_dir.clone()).await?;
            info!(dir = %storage.dir().display(), "Using file workflow storage");
            Arc::new(storage)
        }
    };

    Ok(storage)
}

pub async fn create_engine(config: &AppConfig) -> anyhow::Result<WorkflowEngine> {
    let http: Arc<dyn HttpClientTrait> = Arc::new(HttpClient::new());

    let providers = EndpointProviderResolver::new(http.clone())
        .with_defaults(config.llm.base_url.clone(), config.llm.api_key.clone())
        .with_presets(config.llm.endpoint_presets());

    let knowledge_bases: Arc<dyn KnowledgeBaseRegistry> = match &config.knowledge.registry_path {
        Some(path) => Arc::new(InMemoryKnowledgeBaseRegistry::from_file(path).await?),
        None => Arc::new(InMemoryKnowledgeBaseRegistry::new()),
    };

    let retrieval = InMemoryRetrievalProvider::new();
    if let Some(dir) = &config.knowledge.documents_dir {
        retrieval.load_dir(dir).await?;
    }
    let retrieval: Arc<dyn RetrievalProvider> = Arc::new(retrieval);

    let sandbox = RhaiSandbox::new().with_limits(config.sandbox.clone());

    let engine = WorkflowEngine::builder()
        .http_client(http)
        .providers(Arc::new(providers))
        .knowledge_bases(knowledge_bases)
        .retrieval(retrieval)
        .sandbox(Arc::new(sandbox))
        .settings(EngineSettings {
            run_timeout: config.engine.run_timeout(),
            default_model: config.engine.default_model.clone(),
        })
        .build();

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresetConfig;

    #[tokio::test]
    async fn test_default_state_lists_nothing() {
        let state = create_app_state().await.unwrap();
        assert!(state.workflow_service.list().await.unwrap().is_empty());
        assert!(state.llm_presets.is_empty());
    }

    #[tokio::test]
    async fn test_file_backend_and_presets() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::File;
        config.storage.workflows_dir = dir.path().join("flows");
        config.engine.run_timeout_secs = Some(30);
        config.llm.presets.insert(
            "local".to_string(),
            PresetConfig {
                base_url: "http://localhost:8000/v1".to_string(),
                api_key: "sk-local".to_string(),
            },
        );

        let state = create_app_state_with_config(&config).await.unwrap();
        assert!(dir.path().join("flows").is_dir());
        assert_eq!(
            state.llm_presets.get("local").map(String::as_str),
            Some("http://localhost:8000/v1")
        );

        let engine = create_engine(&config).await.unwrap();
        assert_eq!(
            engine.settings().run_timeout,
            Some(std::time::Duration::from_secs(30))
        );
    }

    #[tokio::test]
    async fn test_missing_registry_is_an_error() {
        let mut config = AppConfig::default();
        config.knowledge.registry_path = Some("/nonexistent/registry.json".into());

        assert!(create_engine(&config).await.is_err());
    }
}
