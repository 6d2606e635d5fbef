//! Workflow engine: depth-first graph traversal over typed node executors

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::nodes::{NodeContext, NodeServices, evaluate_expression, execute_node};
use crate::domain::knowledge_base::{KnowledgeBaseRegistry, RetrievalProvider};
use crate::domain::llm::ProviderResolver;
use crate::domain::workflow::{
    DEFAULT_MODEL, Edge, ExecutionContext, ExecutionOptions, ExecutionResult, ExecutionStatus,
    Node, NodeKind, NodeTrace, OUTPUT_NODE_ID, ScriptSandbox, Workflow, WorkflowError,
    WorkflowExecutor,
};
use crate::infrastructure::http_client::{HttpClient, HttpClientTrait};
use crate::infrastructure::knowledge_base::{
    InMemoryKnowledgeBaseRegistry, InMemoryRetrievalProvider,
};
use crate::infrastructure::llm::EndpointProviderResolver;
use crate::infrastructure::sandbox::RhaiSandbox;

/// Engine-wide execution settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Applied when a run does not carry its own timeout
    pub run_timeout: Option<Duration>,

    /// Model used by LLM nodes that leave theirs blank
    pub default_model: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            run_timeout: None,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Executes workflow definitions against a set of collaborators
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    services: NodeServices,
    settings: EngineSettings,
}

impl WorkflowEngine {
    pub fn new(services: NodeServices) -> Self {
        Self {
            services,
            settings: EngineSettings::default(),
        }
    }

    pub fn builder() -> WorkflowEngineBuilder {
        WorkflowEngineBuilder::default()
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn services(&self) -> &NodeServices {
        &self.services
    }

    async fn traverse<'w>(
        &self,
        workflow: &'w Workflow,
        context: &mut ExecutionContext,
        run: &mut Run<'_>,
    ) -> Result<(), WorkflowError> {
        workflow.validate()?;
        let start = workflow.start_node()?;

        let mut stack: Vec<Frame<'w>> = Vec::new();
        if let Some(frame) = self.visit(workflow, start, context, run).await? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(edge) = frame.successors.get(frame.cursor).copied() else {
                stack.pop();
                continue;
            };
            frame.cursor += 1;
            let from = frame.node_id;

            // Edge conditions see the state at the moment the edge is reached
            if let Some(condition) = edge.condition() {
                if !evaluate_expression(self.services.sandbox.as_ref(), context, condition) {
                    debug!(edge_id = edge.id(), "Edge condition is false, not following");
                    continue;
                }
            }

            let Some(node) = workflow.get_node(edge.target()) else {
                warn!(from, target = edge.target(), "Successor node not found, skipping");
                continue;
            };

            if let Some(next) = self.visit(workflow, node, context, run).await? {
                stack.push(next);
            }
        }

        Ok(())
    }

    /// Execute one node, returning the frame of its successors
    async fn visit<'w>(
        &self,
        workflow: &'w Workflow,
        node: &'w Node,
        context: &mut ExecutionContext,
        run: &mut Run<'_>,
    ) -> Result<Option<Frame<'w>>, WorkflowError> {
        let node_id = node.id();
        if !run.visited.insert(node_id.to_string()) {
            warn!(
                execution_id = run.execution_id,
                node_id, "Node already visited, skipping"
            );
            return Ok(None);
        }

        run.check_alive()?;

        let node_type = node.node_type();
        debug!(
            execution_id = run.execution_id,
            node_id,
            node_type = %node_type,
            "Executing node"
        );

        let started = Instant::now();
        let outcome = {
            let node_ctx = NodeContext {
                node_id,
                context,
                services: &self.services,
                default_model: &self.settings.default_model,
                stream: run.options.stream,
                fragments: run.options.fragments.as_ref(),
                cancellation: &run.token,
            };

            tokio::select! {
                result = execute_node(node.kind(), &node_ctx) => result,
                _ = run.token.cancelled() => Err(WorkflowError::Cancelled),
                _ = deadline_elapsed(run.deadline) => Err(WorkflowError::run_timeout(run.timeout_ms)),
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                if matches!(e, WorkflowError::RunTimeout { .. }) {
                    run.token.cancel();
                }
                error!(
                    execution_id = run.execution_id,
                    node_id,
                    node_type = %node_type,
                    error = %e,
                    "Node failed"
                );
                run.trace
                    .push(NodeTrace::failure(node_id, node_type, e.to_string(), elapsed_ms));
                return Err(e);
            }
        };
        run.trace.push(NodeTrace::success(node_id, node_type, elapsed_ms));

        let outgoing = workflow.edges().iter().filter(|edge| edge.source() == node_id);
        let successors = match node.kind() {
            NodeKind::End(_) => None,
            // Only edges into the chosen branch; no branch means no successor
            NodeKind::Condition(_) => Some(match value.as_str() {
                Some(branch) => outgoing.filter(|edge| edge.target() == branch).collect(),
                None => Vec::new(),
            }),
            _ => Some(outgoing.collect()),
        };

        context.record_result(node_id, value);

        Ok(successors.map(|successors| Frame {
            node_id,
            successors,
            cursor: 0,
        }))
    }
}

#[async_trait]
impl WorkflowExecutor for WorkflowEngine {
    async fn execute(
        &self,
        workflow: &Workflow,
        inputs: Map<String, Value>,
        options: ExecutionOptions,
    ) -> ExecutionResult {
        let execution_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let timeout = options.timeout.or(self.settings.run_timeout);

        info!(
            execution_id = %execution_id,
            workflow_id = %workflow.id(),
            nodes = workflow.nodes().len(),
            stream = options.stream,
            "Starting workflow execution"
        );

        let mut context = ExecutionContext::new(inputs, workflow.variables().clone());
        let mut run = Run::new(&execution_id, &options, timeout);
        let outcome = self.traverse(workflow, &mut context, &mut run).await;

        let outputs = collect_outputs(workflow, &context);
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let (status, error) = match outcome {
            Ok(()) => {
                info!(
                    execution_id = %execution_id,
                    workflow_id = %workflow.id(),
                    execution_time_ms,
                    "Workflow execution completed"
                );
                (ExecutionStatus::Completed, None)
            }
            Err(e) => {
                error!(
                    execution_id = %execution_id,
                    workflow_id = %workflow.id(),
                    execution_time_ms,
                    error = %e,
                    "Workflow execution failed"
                );
                (ExecutionStatus::Failed, Some(e.to_string()))
            }
        };

        let trace = std::mem::take(&mut run.trace);
        let (node_results, execution_order) = context.into_node_results().into_parts();

        ExecutionResult {
            execution_id,
            workflow_id: workflow.id().to_string(),
            status,
            outputs,
            error,
            execution_time_ms,
            node_results,
            execution_order,
            trace,
        }
    }
}

/// Output mapping of the `end` node, or every node result when it has none
pub fn collect_outputs(workflow: &Workflow, context: &ExecutionContext) -> Map<String, Value> {
    if let Some(NodeKind::End(end)) = workflow.get_node(OUTPUT_NODE_ID).map(Node::kind) {
        if !end.output_mapping.is_empty() {
            return end
                .output_mapping
                .iter()
                .map(|(key, template)| (key.clone(), Value::String(context.resolve_string(template))))
                .collect();
        }
    }

    context.node_results().to_map()
}

/// Pending successors of an executed node
#[derive(Debug)]
struct Frame<'w> {
    node_id: &'w str,
    successors: Vec<&'w Edge>,
    cursor: usize,
}

/// Mutable state of a single run
struct Run<'a> {
    execution_id: &'a str,
    options: &'a ExecutionOptions,
    token: CancellationToken,
    deadline: Option<Instant>,
    timeout_ms: u64,
    visited: HashSet<String>,
    trace: Vec<NodeTrace>,
}

impl<'a> Run<'a> {
    fn new(execution_id: &'a str, options: &'a ExecutionOptions, timeout: Option<Duration>) -> Self {
        Self {
            execution_id,
            options,
            token: options.cancellation.child_token(),
            // A deadline past what the clock can represent is no deadline
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
            timeout_ms: timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default(),
            visited: HashSet::new(),
            trace: Vec::new(),
        }
    }

    fn check_alive(&self) -> Result<(), WorkflowError> {
        if self.token.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.token.cancel();
            return Err(WorkflowError::run_timeout(self.timeout_ms));
        }
        Ok(())
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Builder for [`WorkflowEngine`]; unset collaborators get local defaults
#[derive(Debug, Default)]
pub struct WorkflowEngineBuilder {
    providers: Option<Arc<dyn ProviderResolver>>,
    retrieval: Option<Arc<dyn RetrievalProvider>>,
    knowledge_bases: Option<Arc<dyn KnowledgeBaseRegistry>>,
    http: Option<Arc<dyn HttpClientTrait>>,
    sandbox: Option<Arc<dyn ScriptSandbox>>,
    settings: EngineSettings,
}

impl WorkflowEngineBuilder {
    pub fn providers(mut self, providers: Arc<dyn ProviderResolver>) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn retrieval(mut self, retrieval: Arc<dyn RetrievalProvider>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn knowledge_bases(mut self, registry: Arc<dyn KnowledgeBaseRegistry>) -> Self {
        self.knowledge_bases = Some(registry);
        self
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClientTrait>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn sandbox(mut self, sandbox: Arc<dyn ScriptSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> WorkflowEngine {
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(HttpClient::new()) as Arc<dyn HttpClientTrait>);
        let providers = self.providers.unwrap_or_else(|| {
            Arc::new(EndpointProviderResolver::new(http.clone())) as Arc<dyn ProviderResolver>
        });

        let services = NodeServices {
            providers,
            retrieval: self
                .retrieval
                .unwrap_or_else(|| Arc::new(InMemoryRetrievalProvider::new()) as Arc<dyn RetrievalProvider>),
            knowledge_bases: self
                .knowledge_bases
                .unwrap_or_else(|| {
                    Arc::new(InMemoryKnowledgeBaseRegistry::new()) as Arc<dyn KnowledgeBaseRegistry>
                }),
            http,
            sandbox: self
                .sandbox
                .unwrap_or_else(|| Arc::new(RhaiSandbox::new()) as Arc<dyn ScriptSandbox>),
        };

        WorkflowEngine::new(services).with_settings(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::domain::knowledge_base::MockRetrievalProvider;
    use crate::domain::llm::{MockLlmProvider, StaticProviderResolver};
    use crate::domain::workflow::{
        BranchCondition, CodeNode, ConditionNode, EndNode, LlmNode, RagNode, TemplateNode,
        WorkflowId,
    };
    use crate::infrastructure::sandbox::SandboxLimits;

    fn engine_with(provider: MockLlmProvider) -> WorkflowEngine {
        WorkflowEngine::builder()
            .providers(Arc::new(StaticProviderResolver::new(Arc::new(provider))))
            .build()
    }

    fn engine() -> WorkflowEngine {
        engine_with(MockLlmProvider::new("mock").with_content("mock answer"))
    }

    fn workflow() -> Workflow {
        Workflow::new(WorkflowId::new("test").unwrap(), "Test")
            .with_node(Node::new("start", NodeKind::Start))
    }

    fn template(id: &str, text: &str) -> Node {
        Node::new(
            id,
            NodeKind::Template(TemplateNode {
                template: text.to_string(),
            }),
        )
    }

    fn inputs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_lone_start_node() {
        let result = engine()
            .execute(&workflow(), Map::new(), ExecutionOptions::new())
            .await;

        assert!(result.is_success());
        assert_eq!(
            Value::Object(result.outputs),
            json!({"start": {"status": "started"}})
        );
        assert_eq!(result.execution_order, vec!["start"]);
        assert_eq!(result.trace.len(), 1);
        assert!(result.trace[0].success);
    }

    #[tokio::test]
    async fn test_two_start_nodes_is_definition_error() {
        let wf = workflow().with_node(Node::new("start_2", NodeKind::Start));
        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().starts_with("Invalid workflow definition"));
        assert!(result.node_results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_start_node() {
        let wf = Workflow::new(WorkflowId::new("empty").unwrap(), "Empty");
        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().contains("missing start node"));
    }

    #[tokio::test]
    async fn test_cycle_runs_each_node_once() {
        let wf = workflow()
            .with_node(template("a", "A"))
            .with_node(template("b", "B"))
            .with_edge(Edge::new("e1", "start", "a"))
            .with_edge(Edge::new("e2", "a", "b"))
            .with_edge(Edge::new("e3", "b", "a"));

        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert!(result.is_success());
        assert_eq!(result.execution_order, vec!["start", "a", "b"]);
        assert_eq!(result.trace.len(), 3);
    }

    #[tokio::test]
    async fn test_depth_first_pre_order() {
        let wf = workflow()
            .with_node(template("a", "A"))
            .with_node(template("a_child", "{{a}}!"))
            .with_node(template("b", "B"))
            .with_edge(Edge::new("e1", "start", "a"))
            .with_edge(Edge::new("e2", "start", "b"))
            .with_edge(Edge::new("e3", "a", "a_child"));

        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert_eq!(result.execution_order, vec!["start", "a", "a_child", "b"]);
        assert_eq!(result.node_result("a_child"), Some(&json!("A!")));
    }

    #[tokio::test]
    async fn test_condition_selects_branch() {
        let condition = ConditionNode {
            conditions: vec![BranchCondition {
                condition: "{{x}} > 5".to_string(),
                branch: "hi".to_string(),
            }],
            default_branch: Some("lo".to_string()),
        };
        let wf = workflow()
            .with_node(Node::new("cond", NodeKind::Condition(condition)))
            .with_node(template("hi", "high"))
            .with_node(template("lo", "low"))
            .with_edge(Edge::new("e1", "start", "cond"))
            .with_edge(Edge::new("e2", "cond", "hi"))
            .with_edge(Edge::new("e3", "cond", "lo"));

        let engine = engine();

        let high = engine
            .execute(&wf, inputs(json!({"x": 10})), ExecutionOptions::new())
            .await;
        assert_eq!(high.node_result("cond"), Some(&json!("hi")));
        assert!(high.node_results.contains_key("hi"));
        assert!(!high.node_results.contains_key("lo"));

        let low = engine
            .execute(&wf, inputs(json!({"x": 2})), ExecutionOptions::new())
            .await;
        assert_eq!(low.node_result("cond"), Some(&json!("lo")));
        assert!(low.node_results.contains_key("lo"));
        assert!(!low.node_results.contains_key("hi"));
    }

    fn high_low_condition() -> Node {
        Node::new(
            "cond",
            NodeKind::Condition(ConditionNode {
                conditions: vec![BranchCondition {
                    condition: "{{x}} > 5".to_string(),
                    branch: "hi".to_string(),
                }],
                default_branch: None,
            }),
        )
    }

    #[tokio::test]
    async fn test_condition_branch_needs_an_edge() {
        let wf = workflow()
            .with_node(high_low_condition())
            .with_node(template("hi", "high"))
            .with_node(template("audit", "audited"))
            .with_edge(Edge::new("e1", "start", "cond"))
            .with_edge(Edge::new("e2", "cond", "audit"));

        let result = engine()
            .execute(&wf, inputs(json!({"x": 10})), ExecutionOptions::new())
            .await;

        assert!(result.is_success());
        assert_eq!(result.node_result("cond"), Some(&json!("hi")));
        assert_eq!(result.execution_order, vec!["start", "cond"]);
    }

    #[tokio::test]
    async fn test_condition_follows_edge_into_branch() {
        let wf = workflow()
            .with_node(high_low_condition())
            .with_node(template("hi", "high"))
            .with_node(template("audit", "audited"))
            .with_edge(Edge::new("e1", "start", "cond"))
            .with_edge(Edge::new("e2", "cond", "audit"))
            .with_edge(Edge::new("e3", "cond", "hi"));

        let engine = engine();

        let high = engine
            .execute(&wf, inputs(json!({"x": 10})), ExecutionOptions::new())
            .await;
        assert_eq!(high.execution_order, vec!["start", "cond", "hi"]);

        // No matching condition and no default: nothing follows
        let low = engine
            .execute(&wf, inputs(json!({"x": 2})), ExecutionOptions::new())
            .await;
        assert!(low.is_success());
        assert_eq!(low.node_result("cond"), Some(&Value::Null));
        assert_eq!(low.execution_order, vec!["start", "cond"]);
    }

    #[tokio::test]
    async fn test_condition_branch_edge_keeps_its_condition() {
        let wf = workflow()
            .with_node(high_low_condition())
            .with_node(template("hi", "high"))
            .with_edge(Edge::new("e1", "start", "cond"))
            .with_edge(Edge::new("e2", "cond", "hi").with_condition("{{armed}} == true"));

        let result = engine()
            .execute(
                &wf,
                inputs(json!({"x": 10, "armed": false})),
                ExecutionOptions::new(),
            )
            .await;

        assert_eq!(result.execution_order, vec!["start", "cond"]);
    }

    #[tokio::test]
    async fn test_edge_condition() {
        let wf = workflow()
            .with_node(template("a", "A"))
            .with_node(template("b", "B"))
            .with_edge(Edge::new("e1", "start", "a").with_condition("{{flag}} == true"))
            .with_edge(Edge::new("e2", "start", "b"));

        let result = engine()
            .execute(&wf, inputs(json!({"flag": false})), ExecutionOptions::new())
            .await;

        assert!(result.is_success());
        assert_eq!(result.execution_order, vec!["start", "b"]);
    }

    #[tokio::test]
    async fn test_end_terminates_only_its_branch() {
        let wf = workflow()
            .with_node(Node::new("end", NodeKind::End(EndNode::default())))
            .with_node(template("after_end", "never"))
            .with_node(template("sibling", "runs"))
            .with_edge(Edge::new("e1", "start", "end"))
            .with_edge(Edge::new("e2", "end", "after_end"))
            .with_edge(Edge::new("e3", "start", "sibling"));

        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert_eq!(result.execution_order, vec!["start", "end", "sibling"]);
        assert_eq!(result.node_result("end"), Some(&json!({"status": "completed"})));
    }

    #[tokio::test]
    async fn test_output_mapping() {
        let end = EndNode {
            output_mapping: BTreeMap::from([
                ("greeting".to_string(), "{{greet}}".to_string()),
                ("missing".to_string(), "{{nope}}".to_string()),
            ]),
        };
        let wf = workflow()
            .with_node(template("greet", "Hello {{name}}"))
            .with_node(Node::new("end", NodeKind::End(end)))
            .with_edge(Edge::new("e1", "start", "greet"))
            .with_edge(Edge::new("e2", "greet", "end"));

        let result = engine()
            .execute(&wf, inputs(json!({"name": "Ada"})), ExecutionOptions::new())
            .await;

        assert_eq!(
            Value::Object(result.outputs),
            json!({"greeting": "Hello Ada", "missing": "{{nope}}"})
        );
    }

    #[tokio::test]
    async fn test_template_without_input_stays_literal() {
        let wf = workflow()
            .with_node(template("greet", "Hello {{name}}"))
            .with_edge(Edge::new("e1", "start", "greet"));

        let result = engine().execute(&wf, Map::new(), ExecutionOptions::new()).await;
        assert_eq!(result.node_result("greet"), Some(&json!("Hello {{name}}")));
    }

    #[tokio::test]
    async fn test_failing_model_keeps_prior_results() {
        let wf = workflow()
            .with_node(template("prompt", "Say hi"))
            .with_node(Node::new(
                "llm",
                NodeKind::Llm(LlmNode {
                    user_message: "{{prompt}}".to_string(),
                    ..Default::default()
                }),
            ))
            .with_node(template("after", "unreachable"))
            .with_edge(Edge::new("e1", "start", "prompt"))
            .with_edge(Edge::new("e2", "prompt", "llm"))
            .with_edge(Edge::new("e3", "llm", "after"));

        let engine = engine_with(MockLlmProvider::new("mock").with_error("upstream down"));
        let result = engine.execute(&wf, Map::new(), ExecutionOptions::new()).await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        let error = result.error.clone().unwrap();
        assert!(error.contains("upstream down"));
        assert_eq!(result.execution_order, vec!["start", "prompt"]);
        assert!(!result.node_results.contains_key("llm"));
        assert!(!result.node_results.contains_key("after"));

        let last = result.trace.last().unwrap();
        assert_eq!(last.node_id, "llm");
        assert!(!last.success);
    }

    #[tokio::test]
    async fn test_rag_without_knowledge_bases_skips_retrieval() {
        let retrieval = Arc::new(MockRetrievalProvider::new("never"));
        let engine = WorkflowEngine::builder().retrieval(retrieval.clone()).build();

        let wf = workflow()
            .with_node(Node::new(
                "rag",
                NodeKind::Rag(RagNode {
                    kb_ids: vec![],
                    query: "q".to_string(),
                    top_k: 3,
                }),
            ))
            .with_edge(Edge::new("e1", "start", "rag"));

        let result = engine.execute(&wf, Map::new(), ExecutionOptions::new()).await;
        assert_eq!(result.node_result("rag"), Some(&json!("")));
        assert_eq!(retrieval.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let result = engine()
            .execute(
                &workflow(),
                Map::new(),
                ExecutionOptions::new().with_cancellation(token),
            )
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Execution cancelled"));
        assert!(result.node_results.is_empty());
    }

    #[tokio::test]
    async fn test_run_timeout_interrupts_node() {
        let sandbox = RhaiSandbox::new().with_limits(SandboxLimits {
            max_operations: 0,
            ..Default::default()
        });
        let engine = WorkflowEngine::builder().sandbox(Arc::new(sandbox)).build();

        let wf = workflow()
            .with_node(Node::new(
                "spin",
                NodeKind::Code(CodeNode {
                    code: "loop {}".to_string(),
                    timeout: 30,
                }),
            ))
            .with_edge(Edge::new("e1", "start", "spin"));

        let result = engine
            .execute(
                &wf,
                Map::new(),
                ExecutionOptions::new().with_timeout(Duration::from_millis(100)),
            )
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Execution timed out after 100ms"));
        assert!(result.node_results.contains_key("start"));
        assert!(!result.trace.last().unwrap().success);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_runs_unbounded() {
        let result = engine()
            .execute(
                &workflow(),
                Map::new(),
                ExecutionOptions::new().with_timeout(Duration::from_secs(u64::MAX)),
            )
            .await;

        assert!(result.is_success());
        assert_eq!(result.execution_order, vec!["start"]);
    }
}
