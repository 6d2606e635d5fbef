//! Workflow executor trait and result types

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::entity::Workflow;
use super::node_types::NodeType;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,

    pub workflow_id: String,

    pub status: ExecutionStatus,

    /// Output mapping of the `end` node, or every node result when it has none
    pub outputs: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,

    /// Result of every node that completed, keyed by node identifier
    pub node_results: HashMap<String, Value>,

    #[serde(default)]
    pub execution_order: Vec<String>,

    #[serde(default)]
    pub trace: Vec<NodeTrace>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Result of a single node, if it ran
    pub fn node_result(&self, node_id: &str) -> Option<&Value> {
        self.node_results.get(node_id)
    }
}

/// Timing and outcome of a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTrace {
    pub node_id: String,

    pub node_type: NodeType,

    pub success: bool,

    pub execution_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeTrace {
    pub fn success(node_id: impl Into<String>, node_type: NodeType, execution_time_ms: u64) -> Self {
        Self {
            node_id: node_id.into(),
            node_type,
            success: true,
            execution_time_ms,
            error: None,
        }
    }

    pub fn failure(
        node_id: impl Into<String>,
        node_type: NodeType,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type,
            success: false,
            execution_time_ms,
            error: Some(error.into()),
        }
    }
}

/// A piece of streamed model output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamFragment {
    pub node_id: String,
    pub delta: String,
}

/// Per-run execution settings
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Stream model responses instead of single-shot completions
    pub stream: bool,

    /// Upper bound for the whole run
    pub timeout: Option<Duration>,

    pub cancellation: CancellationToken,

    /// Receives model fragments as they arrive when streaming
    pub fragments: Option<mpsc::UnboundedSender<StreamFragment>>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_fragments(mut self, sender: mpsc::UnboundedSender<StreamFragment>) -> Self {
        self.fragments = Some(sender);
        self
    }
}

/// Runs workflow definitions
#[async_trait]
pub trait WorkflowExecutor: Send + Sync + std::fmt::Debug {
    /// Execute a workflow; failures are reported through the result status
    async fn execute(
        &self,
        workflow: &Workflow,
        inputs: Map<String, Value>,
        options: ExecutionOptions,
    ) -> ExecutionResult;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Executor that records the inputs it was called with
    #[derive(Debug, Default)]
    pub struct MockWorkflowExecutor {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl MockWorkflowExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkflowExecutor for MockWorkflowExecutor {
        async fn execute(
            &self,
            workflow: &Workflow,
            inputs: Map<String, Value>,
            _options: ExecutionOptions,
        ) -> ExecutionResult {
            self.calls
                .lock()
                .unwrap()
                .push((workflow.id().to_string(), inputs.clone()));

            ExecutionResult {
                execution_id: "mock".to_string(),
                workflow_id: workflow.id().to_string(),
                status: ExecutionStatus::Completed,
                outputs: inputs,
                error: None,
                execution_time_ms: 0,
                node_results: HashMap::new(),
                execution_order: Vec::new(),
                trace: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_result_serialization() {
        let result = ExecutionResult {
            execution_id: "id".into(),
            workflow_id: "wf".into(),
            status: ExecutionStatus::Failed,
            outputs: Map::new(),
            error: Some("boom".into()),
            execution_time_ms: 12,
            node_results: HashMap::from([("start".to_string(), json!({"status": "started"}))]),
            execution_order: vec!["start".into()],
            trace: vec![NodeTrace::success("start", NodeType::Start, 0)],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["node_results"]["start"]["status"], "started");
        assert_eq!(json["trace"][0]["node_type"], "start");
        assert!(!result.is_success());
    }

    #[test]
    fn test_node_trace_failure() {
        let trace = NodeTrace::failure("llm_1", NodeType::Llm, "timeout", 30);
        assert!(!trace.success);
        assert_eq!(trace.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_options_builder() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let options = ExecutionOptions::new()
            .with_stream(true)
            .with_timeout(Duration::from_secs(5))
            .with_fragments(tx);

        assert!(options.stream);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert!(options.fragments.is_some());
        assert!(!options.cancellation.is_cancelled());
    }
}
