//! Workflow service - CRUD and execute-by-id for workflow definitions

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::domain::storage::Storage;
use crate::domain::{
    DomainError, Edge, ExecutionOptions, ExecutionResult, Node, Workflow, WorkflowExecutor,
    WorkflowId,
};

/// Request to create a new workflow
#[derive(Debug, Clone, Default)]
pub struct CreateWorkflowRequest {
    /// Generated when absent
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub variables: Map<String, Value>,
}

impl CreateWorkflowRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkflowRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub nodes: Option<Vec<Node>>,
    pub edges: Option<Vec<Edge>>,
    pub variables: Option<Map<String, Value>>,
}

impl UpdateWorkflowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = Some(edges);
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// Stores workflow definitions and runs them by identifier
pub struct WorkflowService {
    storage: Arc<dyn Storage<Workflow>>,
    executor: Arc<dyn WorkflowExecutor>,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService").finish()
    }
}

impl WorkflowService {
    pub fn new(storage: Arc<dyn Storage<Workflow>>, executor: Arc<dyn WorkflowExecutor>) -> Self {
        Self { storage, executor }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.get(&workflow_id).await
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, DomainError> {
        let mut workflows = self.storage.list().await?;
        workflows.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        Ok(workflows)
    }

    /// Create a workflow. A definition without nodes is stored as a draft;
    /// anything else must pass graph validation.
    pub async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError> {
        let workflow_id = match request.id.as_deref() {
            Some(id) => self.parse_id(id)?,
            None => WorkflowId::generate(),
        };

        if self.storage.exists(&workflow_id).await? {
            return Err(DomainError::conflict(format!(
                "Workflow '{}' already exists",
                workflow_id
            )));
        }

        let mut workflow = Workflow::new(workflow_id, request.name)
            .with_nodes(request.nodes)
            .with_edges(request.edges)
            .with_variables(request.variables);

        if let Some(description) = request.description {
            workflow = workflow.with_description(description);
        }

        Self::validate(&workflow)?;

        let workflow = self.storage.create(workflow).await?;
        info!(workflow_id = %workflow.id(), "Workflow created");
        Ok(workflow)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateWorkflowRequest,
    ) -> Result<Workflow, DomainError> {
        let workflow_id = self.parse_id(id)?;

        let mut workflow = self
            .storage
            .get(&workflow_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Workflow '{}' not found", id)))?;

        if let Some(name) = request.name {
            workflow.set_name(name);
        }

        if let Some(description) = request.description {
            workflow.set_description(description);
        }

        if let Some(nodes) = request.nodes {
            workflow.set_nodes(nodes);
        }

        if let Some(edges) = request.edges {
            workflow.set_edges(edges);
        }

        if let Some(variables) = request.variables {
            workflow.set_variables(variables);
        }

        Self::validate(&workflow)?;
        workflow.increment_version();

        let workflow = self.storage.update(workflow).await?;
        info!(workflow_id = %workflow.id(), version = workflow.version(), "Workflow updated");
        Ok(workflow)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.delete(&workflow_id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.exists(&workflow_id).await
    }

    /// Load a stored definition and run it
    pub async fn execute(
        &self,
        id: &str,
        inputs: Map<String, Value>,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, DomainError> {
        let workflow = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Workflow '{}' not found", id)))?;

        Ok(self.executor.execute(&workflow, inputs, options).await)
    }

    fn parse_id(&self, id: &str) -> Result<WorkflowId, DomainError> {
        WorkflowId::new(id).map_err(|e| DomainError::invalid_id(e.to_string()))
    }

    fn validate(workflow: &Workflow) -> Result<(), DomainError> {
        if workflow.nodes().is_empty() && workflow.edges().is_empty() {
            return Ok(());
        }
        workflow.validate().map_err(DomainError::from)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::workflow::mock::MockWorkflowExecutor;
    use crate::domain::{NodeKind, workflow::TemplateNode};
    use crate::infrastructure::storage::InMemoryStorage;

    fn service() -> (WorkflowService, Arc<MockWorkflowExecutor>) {
        let executor = Arc::new(MockWorkflowExecutor::new());
        let service = WorkflowService::new(
            Arc::new(InMemoryStorage::<Workflow>::new()),
            executor.clone(),
        );
        (service, executor)
    }

    fn greeting_nodes() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            Node::new("start", NodeKind::Start),
            Node::new(
                "greet",
                NodeKind::Template(TemplateNode {
                    template: "Hello {{name}}".to_string(),
                }),
            ),
        ];
        let edges = vec![Edge::new("e1", "start", "greet")];
        (nodes, edges)
    }

    #[tokio::test]
    async fn test_create_generates_short_id() {
        let (service, _) = service();

        let workflow = service
            .create(CreateWorkflowRequest::new("Draft"))
            .await
            .unwrap();

        assert_eq!(workflow.id().as_str().len(), 8);
        assert_eq!(workflow.version(), 1);
        assert!(workflow.nodes().is_empty());
        assert!(service.exists(workflow.id().as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_with_explicit_id_and_conflict() {
        let (service, _) = service();
        let (nodes, edges) = greeting_nodes();

        let request = CreateWorkflowRequest::new("Greeter")
            .with_id("greeter")
            .with_description("Says hello")
            .with_nodes(nodes)
            .with_edges(edges);

        let workflow = service.create(request.clone()).await.unwrap();
        assert_eq!(workflow.id().as_str(), "greeter");
        assert_eq!(workflow.description(), Some("Says hello"));

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_graph() {
        let (service, _) = service();

        let request = CreateWorkflowRequest::new("Broken").with_nodes(vec![Node::new(
            "greet",
            NodeKind::Template(TemplateNode {
                template: "hi".to_string(),
            }),
        )]);

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("missing start node"));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let (service, _) = service();

        let err = service
            .create(CreateWorkflowRequest::new("Bad").with_id("bad id!"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidId { .. }));

        assert!(service.get("-nope").await.is_err());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let (service, _) = service();
        let created = service
            .create(CreateWorkflowRequest::new("Draft").with_id("draft"))
            .await
            .unwrap();

        let (nodes, edges) = greeting_nodes();
        let updated = service
            .update(
                "draft",
                UpdateWorkflowRequest::new()
                    .with_name("Greeter")
                    .with_nodes(nodes)
                    .with_edges(edges)
                    .with_variables(json!({"name": "world"}).as_object().cloned().unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Greeter");
        assert_eq!(updated.version(), 2);
        assert_eq!(updated.nodes().len(), 2);
        assert_eq!(updated.variables()["name"], json!("world"));
        assert!(updated.updated_at() >= created.updated_at());
        assert_eq!(updated.created_at(), created.created_at());
    }

    #[tokio::test]
    async fn test_update_validates_and_keeps_stored_copy() {
        let (service, _) = service();
        let (nodes, edges) = greeting_nodes();
        service
            .create(
                CreateWorkflowRequest::new("Greeter")
                    .with_id("greeter")
                    .with_nodes(nodes)
                    .with_edges(edges),
            )
            .await
            .unwrap();

        let err = service
            .update(
                "greeter",
                UpdateWorkflowRequest::new().with_edges(vec![Edge::new("e1", "start", "ghost")]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let stored = service.get("greeter").await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.edges()[0].target(), "greet");
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let (service, _) = service();

        let err = service
            .update("missing", UpdateWorkflowRequest::new().with_name("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, _) = service();
        service
            .create(CreateWorkflowRequest::new("Draft").with_id("draft"))
            .await
            .unwrap();

        assert!(service.delete("draft").await.unwrap());
        assert!(!service.delete("draft").await.unwrap());
        assert!(service.get("draft").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execute_passes_inputs() {
        let (service, executor) = service();
        let (nodes, edges) = greeting_nodes();
        service
            .create(
                CreateWorkflowRequest::new("Greeter")
                    .with_id("greeter")
                    .with_nodes(nodes)
                    .with_edges(edges),
            )
            .await
            .unwrap();

        let inputs = json!({"name": "Ada"}).as_object().cloned().unwrap();
        let result = service
            .execute("greeter", inputs.clone(), ExecutionOptions::new())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.workflow_id, "greeter");
        assert_eq!(executor.calls(), vec![("greeter".to_string(), inputs)]);
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let (service, executor) = service();

        let err = service
            .execute("missing", Map::new(), ExecutionOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(executor.calls().is_empty());
    }
}
