//! Application state shared by the handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{DomainError, ExecutionOptions, ExecutionResult, Workflow};
use crate::infrastructure::services::{
    CreateWorkflowRequest, UpdateWorkflowRequest, WorkflowService,
};

#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<dyn WorkflowServiceTrait>,
    /// Named model endpoints (`config_id` to base URL); keys are never exposed
    pub llm_presets: Arc<BTreeMap<String, String>>,
}

impl AppState {
    pub fn new(workflow_service: Arc<dyn WorkflowServiceTrait>) -> Self {
        Self {
            workflow_service,
            llm_presets: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_llm_presets(mut self, presets: BTreeMap<String, String>) -> Self {
        self.llm_presets = Arc::new(presets);
        self
    }
}

#[async_trait::async_trait]
pub trait WorkflowServiceTrait: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError>;
    async fn list(&self) -> Result<Vec<Workflow>, DomainError>;
    async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError>;
    async fn update(&self, id: &str, request: UpdateWorkflowRequest) -> Result<Workflow, DomainError>;
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;
    async fn execute(
        &self,
        id: &str,
        inputs: Map<String, Value>,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, DomainError>;
}

#[async_trait::async_trait]
impl WorkflowServiceTrait for WorkflowService {
    async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        WorkflowService::get(self, id).await
    }

    async fn list(&self) -> Result<Vec<Workflow>, DomainError> {
        WorkflowService::list(self).await
    }

    async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError> {
        WorkflowService::create(self, request).await
    }

    async fn update(&self, id: &str, request: UpdateWorkflowRequest) -> Result<Workflow, DomainError> {
        WorkflowService::update(self, id, request).await
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        WorkflowService::delete(self, id).await
    }

    async fn execute(
        &self,
        id: &str,
        inputs: Map<String, Value>,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, DomainError> {
        WorkflowService::execute(self, id, inputs, options).await
    }
}
