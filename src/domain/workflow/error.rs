//! Workflow error types

use thiserror::Error;

/// Errors that can occur while loading, validating or running a workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid workflow definition: {0}")]
    Definition(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timeout in node '{node}' after {timeout_ms}ms")]
    Timeout { node: String, timeout_ms: u64 },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Execution timed out after {timeout_ms}ms")]
    RunTimeout { timeout_ms: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl WorkflowError {
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound(node_id.into())
    }

    pub fn node_execution(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    pub fn timeout(node: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            node: node.into(),
            timeout_ms,
        }
    }

    pub fn run_timeout(timeout_ms: u64) -> Self {
        Self::RunTimeout { timeout_ms }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
