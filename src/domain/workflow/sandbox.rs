//! Script sandbox abstraction for code nodes and condition expressions

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::WorkflowError;

/// A script to run with its bindings
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub code: String,

    /// Caller-supplied inputs
    pub inputs: Value,

    /// Results of nodes executed so far
    pub results: Value,

    /// `{inputs, variables, outputs}`
    pub context: Value,

    pub timeout: Duration,

    pub cancellation: CancellationToken,
}

impl ScriptRequest {
    pub fn new(code: impl Into<String>, timeout: Duration) -> Self {
        Self {
            code: code.into(),
            inputs: Value::Object(Default::default()),
            results: Value::Object(Default::default()),
            context: Value::Object(Default::default()),
            timeout,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_results(mut self, results: Value) -> Self {
        self.results = results;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Isolated evaluator for author-supplied code
///
/// Implementations must not expose filesystem, process or network access.
#[async_trait]
pub trait ScriptSandbox: Send + Sync + Debug {
    /// Run a script and return the final value of its `output` variable
    async fn run(&self, request: ScriptRequest) -> Result<Value, WorkflowError>;

    /// Evaluate a boolean expression whose placeholders are already resolved
    fn evaluate_condition(&self, expression: &str) -> Result<bool, WorkflowError>;
}
