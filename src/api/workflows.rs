//! Workflow endpoints

use std::time::Duration;

use axum::extract::{Path, State};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::workflow::templates::{TEMPLATE_NAMES, WorkflowTemplate, builtin_template};
use crate::domain::{Edge, ExecutionOptions, ExecutionResult, Node, Workflow};
use crate::infrastructure::services::{CreateWorkflowRequest, UpdateWorkflowRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowApiRequest {
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl From<CreateWorkflowApiRequest> for CreateWorkflowRequest {
    fn from(request: CreateWorkflowApiRequest) -> Self {
        Self {
            id: request.workflow_id,
            name: request.name,
            description: request.description,
            nodes: request.nodes,
            edges: request.edges,
            variables: request.variables,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWorkflowApiRequest {
    pub name: Option<String>,
    /// `null` clears the description, absence keeps it
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub nodes: Option<Vec<Node>>,
    pub edges: Option<Vec<Edge>>,
    pub variables: Option<Map<String, Value>>,
}

impl From<UpdateWorkflowApiRequest> for UpdateWorkflowRequest {
    fn from(request: UpdateWorkflowApiRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            nodes: request.nodes,
            edges: request.edges,
            variables: request.variables,
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteWorkflowApiRequest {
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the configured run timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListWorkflowsResponse {
    pub workflows: Vec<Workflow>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetSummary {
    pub name: String,
    pub api_url: String,
}

/// GET /api/workflows
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<ListWorkflowsResponse>, ApiError> {
    let workflows = state.workflow_service.list().await?;
    let total = workflows.len();

    Ok(Json(ListWorkflowsResponse { workflows, total }))
}

/// POST /api/workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkflowApiRequest>,
) -> Result<(axum::http::StatusCode, Json<Workflow>), ApiError> {
    debug!(name = %request.name, nodes = request.nodes.len(), "Creating workflow");

    let workflow = state.workflow_service.create(request.into()).await?;

    Ok((axum::http::StatusCode::CREATED, Json(workflow)))
}

/// GET /api/workflows/{workflow_id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Workflow>, ApiError> {
    let workflow = state
        .workflow_service
        .get(&workflow_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Workflow '{}' not found", workflow_id)))?;

    Ok(Json(workflow))
}

/// PUT /api/workflows/{workflow_id}
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(request): Json<UpdateWorkflowApiRequest>,
) -> Result<Json<Workflow>, ApiError> {
    debug!(workflow_id = %workflow_id, "Updating workflow");

    let workflow = state
        .workflow_service
        .update(&workflow_id, request.into())
        .await?;

    Ok(Json(workflow))
}

/// DELETE /api/workflows/{workflow_id}
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.workflow_service.delete(&workflow_id).await? {
        return Err(ApiError::not_found(format!(
            "Workflow '{}' not found",
            workflow_id
        )));
    }

    Ok(Json(json!({ "deleted": true, "workflow_id": workflow_id })))
}

/// POST /api/workflows/{workflow_id}/execute
///
/// A failed run is still a 200; the result carries the failure.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(request): Json<ExecuteWorkflowApiRequest>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let mut options = ExecutionOptions::new().with_stream(request.stream);
    if let Some(secs) = request.timeout_secs.filter(|secs| *secs > 0) {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let result = state
        .workflow_service
        .execute(&workflow_id, request.inputs, options)
        .await?;

    Ok(Json(result))
}

/// GET /api/workflows/templates/{template_name}
pub async fn get_template(
    Path(template_name): Path<String>,
) -> Result<Json<WorkflowTemplate>, ApiError> {
    builtin_template(&template_name).map(Json).ok_or_else(|| {
        ApiError::not_found(format!(
            "Template '{}' not found; available: {}",
            template_name,
            TEMPLATE_NAMES.join(", ")
        ))
    })
}

/// GET /api/workflows/configs
pub async fn list_configs(State(state): State<AppState>) -> Json<Value> {
    let configs: Vec<PresetSummary> = state
        .llm_presets
        .iter()
        .map(|(name, api_url)| PresetSummary {
            name: name.clone(),
            api_url: api_url.clone(),
        })
        .collect();

    Json(json!({ "configs": configs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let request: CreateWorkflowApiRequest =
            serde_json::from_str(r#"{"name": "Draft"}"#).unwrap();

        assert_eq!(request.name, "Draft");
        assert!(request.workflow_id.is_none());
        assert!(request.nodes.is_empty());
        assert!(request.variables.is_empty());
    }

    #[test]
    fn test_create_request_rejects_unknown_node_type() {
        let result = serde_json::from_str::<CreateWorkflowApiRequest>(
            r#"{"name": "x", "nodes": [{"node_id": "a", "node_type": "teleport", "data": {}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null_description() {
        let untouched: UpdateWorkflowApiRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(untouched.description.is_none());

        let cleared: UpdateWorkflowApiRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateWorkflowApiRequest =
            serde_json::from_str(r#"{"description": "new"}"#).unwrap();
        assert_eq!(set.description, Some(Some("new".to_string())));
    }
}
