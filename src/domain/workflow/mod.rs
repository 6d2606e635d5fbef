//! Workflow domain module
//!
//! A workflow is a directed graph of typed nodes. Running one walks the
//! graph depth-first from its single `start` node, recording each node's
//! result so later nodes can reference it with `{{node_id}}`.
//!
//! ## Placeholders
//!
//! `{{name}}` resolves against node results, then the run inputs, then the
//! workflow's global variables. Unknown names are left as-is.

mod context;
mod entity;
mod error;
mod executor;
mod node_types;
mod sandbox;
pub mod templates;

pub use context::{ExecutionContext, NodeResults, value_to_string};
pub use entity::{
    Edge, MAX_ID_LENGTH, Node, OUTPUT_NODE_ID, Position, Workflow, WorkflowId,
    validate_workflow_id,
};
pub use error::WorkflowError;
pub use executor::{
    ExecutionOptions, ExecutionResult, ExecutionStatus, NodeTrace, StreamFragment,
    WorkflowExecutor,
};
pub use node_types::{
    BranchCondition, CodeNode, ConditionNode, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_K, EndNode, HttpMethod, HttpRequestNode, LlmNode, NodeKind,
    NodeType, RagNode, TemplateNode, VariableNode, VariableType,
};
pub use sandbox::{ScriptRequest, ScriptSandbox};

#[cfg(test)]
pub use executor::mock;
