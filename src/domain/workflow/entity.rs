//! Workflow definition entity

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::WorkflowError;
use super::node_types::{NodeKind, NodeType};
use crate::domain::storage::{StorageEntity, StorageKey};

/// Maximum length for workflow IDs
pub const MAX_ID_LENGTH: usize = 50;

/// Identifier of the node whose output mapping shapes the run outputs
pub const OUTPUT_NODE_ID: &str = "end";

/// Regex pattern for valid workflow IDs: alphanumeric, hyphens and underscores
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap()
});

/// Validated workflow identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new validated workflow ID
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        validate_workflow_id(&id)?;
        Ok(Self(id))
    }

    /// Short random identifier (first 8 hex characters of a UUID v4)
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(uuid[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkflowId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkflowId> for String {
    fn from(id: WorkflowId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for WorkflowId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate a workflow ID string
pub fn validate_workflow_id(id: &str) -> Result<(), WorkflowError> {
    if id.is_empty() {
        return Err(WorkflowError::validation("Workflow ID cannot be empty"));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(WorkflowError::validation(format!(
            "Workflow ID exceeds maximum length of {} characters",
            MAX_ID_LENGTH
        )));
    }

    if !ID_PATTERN.is_match(id) {
        return Err(WorkflowError::validation(format!(
            "Invalid workflow ID '{}': must be alphanumeric with hyphens or underscores, start and end with alphanumeric",
            id
        )));
    }

    Ok(())
}

/// Editor canvas position, not used by execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A processing node within a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    node_id: String,
    position: Position,
    kind: NodeKind,
}

/// Stored shape of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    node_id: String,
    node_type: NodeType,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawNode> for Node {
    type Error = WorkflowError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.node_id.is_empty() {
            return Err(WorkflowError::definition("node_id cannot be empty"));
        }

        let kind = NodeKind::from_data(raw.node_type, raw.data).map_err(|e| match e {
            WorkflowError::Definition(message) => {
                WorkflowError::definition(format!("node '{}': {}", raw.node_id, message))
            }
            other => other,
        })?;

        Ok(Self {
            node_id: raw.node_id,
            position: raw.position,
            kind,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        Self {
            node_type: node.kind.node_type(),
            data: node.kind.to_data(),
            node_id: node.node_id,
            position: node.position,
        }
    }
}

impl Node {
    pub fn new(node_id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            node_id: node_id.into(),
            position: Position::default(),
            kind,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn id(&self) -> &str {
        &self.node_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}

/// Directed connection between two nodes, optionally guarded by a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    id: String,
    source: String,
    target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_handles(
        mut self,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Self {
        self.source_handle = source_handle;
        self.target_handle = target_handle;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Guard expression; blank conditions count as absent
    pub fn condition(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .filter(|condition| !condition.trim().is_empty())
    }
}

/// A workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(rename = "workflow_id")]
    id: WorkflowId,

    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default)]
    nodes: Vec<Node>,

    #[serde(default)]
    edges: Vec<Edge>,

    /// Global variables, the last lookup scope of the resolver
    #[serde(default)]
    variables: Map<String, Value>,

    /// Definition version (increments on every update)
    #[serde(default = "initial_version")]
    version: u32,

    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

fn initial_version() -> u32 {
    1
}

impl Workflow {
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            variables: Map::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    // Builder methods

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    // Getters

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == node_id)
    }

    /// The unique entry node
    pub fn start_node(&self) -> Result<&Node, WorkflowError> {
        let mut starts = self
            .nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Start);

        let start = starts
            .next()
            .ok_or_else(|| WorkflowError::definition("missing start node"))?;

        if let Some(other) = starts.next() {
            return Err(WorkflowError::definition(format!(
                "ambiguous entry point: start nodes '{}' and '{}'",
                start.id(),
                other.id()
            )));
        }

        Ok(start)
    }

    /// Check structural invariants of the graph
    pub fn validate(&self) -> Result<(), WorkflowError> {
        self.start_node()?;

        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id()) {
                return Err(WorkflowError::definition(format!(
                    "duplicate node identifier '{}'",
                    node.id()
                )));
            }
        }

        for edge in &self.edges {
            for endpoint in [edge.source(), edge.target()] {
                if !ids.contains(endpoint) {
                    return Err(WorkflowError::definition(format!(
                        "edge '{}' references unknown node '{}'",
                        edge.id(),
                        endpoint
                    )));
                }
            }
        }

        for node in &self.nodes {
            if let NodeKind::Condition(config) = node.kind() {
                if let Some(target) = config.branch_targets().find(|t| !ids.contains(t)) {
                    return Err(WorkflowError::definition(format!(
                        "condition node '{}' branches to unknown node '{}'",
                        node.id(),
                        target
                    )));
                }
            }
        }

        Ok(())
    }

    // Setters (mutate and update timestamp)

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.touch();
    }

    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.touch();
    }

    pub fn set_variables(&mut self, variables: Map<String, Value>) {
        self.variables = variables;
        self.touch();
    }

    pub fn increment_version(&mut self) {
        self.version += 1;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Workflow {
    type Key = WorkflowId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
