//! Node kinds and their typed configurations
//!
//! On the wire a node carries a `node_type` tag and a free-form `data` bag.
//! Both are folded into the closed [`NodeKind`] enum when a definition is
//! loaded, so a node whose configuration does not fit its kind is rejected
//! before anything runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WorkflowError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Node kind tag as it appears in stored definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    End,
    Llm,
    Rag,
    Code,
    Condition,
    HttpRequest,
    Variable,
    Template,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Llm => "llm",
            Self::Rag => "rag",
            Self::Code => "code",
            Self::Condition => "condition",
            Self::HttpRequest => "http_request",
            Self::Variable => "variable",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed configuration of a node, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    End(EndNode),
    Llm(LlmNode),
    Rag(RagNode),
    Code(CodeNode),
    Condition(ConditionNode),
    HttpRequest(HttpRequestNode),
    Variable(VariableNode),
    Template(TemplateNode),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Start => NodeType::Start,
            Self::End(_) => NodeType::End,
            Self::Llm(_) => NodeType::Llm,
            Self::Rag(_) => NodeType::Rag,
            Self::Code(_) => NodeType::Code,
            Self::Condition(_) => NodeType::Condition,
            Self::HttpRequest(_) => NodeType::HttpRequest,
            Self::Variable(_) => NodeType::Variable,
            Self::Template(_) => NodeType::Template,
        }
    }

    /// Build a typed configuration from a kind tag and its data bag
    pub fn from_data(node_type: NodeType, data: Value) -> Result<Self, WorkflowError> {
        let data = match data {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        let kind = match node_type {
            NodeType::Start => Self::Start,
            NodeType::End => Self::End(parse_config(node_type, data)?),
            NodeType::Llm => Self::Llm(parse_config(node_type, data)?),
            NodeType::Rag => Self::Rag(parse_config(node_type, data)?),
            NodeType::Code => Self::Code(parse_config(node_type, data)?),
            NodeType::Condition => Self::Condition(parse_config(node_type, data)?),
            NodeType::HttpRequest => Self::HttpRequest(parse_config(node_type, data)?),
            NodeType::Variable => Self::Variable(parse_config(node_type, data)?),
            NodeType::Template => Self::Template(parse_config(node_type, data)?),
        };

        Ok(kind)
    }

    /// Render the configuration back into a data bag
    pub fn to_data(&self) -> Value {
        let data = match self {
            Self::Start => Ok(Value::Object(serde_json::Map::new())),
            Self::End(config) => serde_json::to_value(config),
            Self::Llm(config) => serde_json::to_value(config),
            Self::Rag(config) => serde_json::to_value(config),
            Self::Code(config) => serde_json::to_value(config),
            Self::Condition(config) => serde_json::to_value(config),
            Self::HttpRequest(config) => serde_json::to_value(config),
            Self::Variable(config) => serde_json::to_value(config),
            Self::Template(config) => serde_json::to_value(config),
        };

        // Plain structs with string keys always serialize
        data.unwrap_or(Value::Null)
    }
}

fn parse_config<T: serde::de::DeserializeOwned>(
    node_type: NodeType,
    data: Value,
) -> Result<T, WorkflowError> {
    serde_json::from_value(data).map_err(|e| {
        WorkflowError::definition(format!("invalid configuration for {} node: {}", node_type, e))
    })
}

/// Terminal node; the one with identifier `end` supplies the output mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndNode {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_mapping: BTreeMap<String, String>,
}

/// Language model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmNode {
    #[serde(default = "default_model")]
    pub model: String,

    /// Named endpoint preset, overrides `api_url` and `api_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub user_message: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub enable_structured_output: bool,

    /// JSON schema, either as an object or as JSON text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output_schema: Option<Value>,
}

impl Default for LlmNode {
    fn default() -> Self {
        Self {
            model: default_model(),
            config_id: None,
            api_url: None,
            api_key: None,
            system_prompt: String::new(),
            user_message: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            enable_structured_output: false,
            structured_output_schema: None,
        }
    }
}

/// Retrieval over one or more knowledge bases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagNode {
    #[serde(default)]
    pub kb_ids: Vec<String>,

    #[serde(default)]
    pub query: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Sandboxed script; the script binds `output`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    #[serde(default)]
    pub code: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub condition: String,
    pub branch: String,
}

/// Ordered branch selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(default)]
    pub conditions: Vec<BranchCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

impl ConditionNode {
    /// Every node identifier this node may select
    pub fn branch_targets(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(|c| c.branch.as_str())
            .chain(self.default_branch.as_deref())
            .filter(|target| !target.is_empty())
    }
}

/// HTTP method for http_request nodes, parsed case-insensitively
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unsupported HTTP method '{}'", other)),
        }
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound HTTP call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestNode {
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Declared type of a variable node's value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableType {
    #[default]
    String,
    Number,
    Boolean,
    Other(String),
}

impl From<String> for VariableType {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" | "bool" => Self::Boolean,
            _ => Self::Other(value),
        }
    }
}

impl From<VariableType> for String {
    fn from(value: VariableType) -> Self {
        match value {
            VariableType::String => "string".to_string(),
            VariableType::Number => "number".to_string(),
            VariableType::Boolean => "boolean".to_string(),
            VariableType::Other(other) => other,
        }
    }
}

/// Reads a named value from the inputs or the global variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableNode {
    pub variable_name: String,

    #[serde(default)]
    pub default_value: Value,

    #[serde(default)]
    pub variable_type: VariableType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    #[serde(default)]
    pub template: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
