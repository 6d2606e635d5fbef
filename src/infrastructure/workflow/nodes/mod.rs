//! Node executors, one module per node kind
//!
//! Every executor reads its typed configuration and the run's
//! [`ExecutionContext`] and produces the node's result value. Executors never
//! mutate the context; the engine records their result after they return.

mod code;
mod condition;
mod http;
mod llm;
mod rag;
mod start_end;
mod template;
mod variable;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::knowledge_base::{KnowledgeBaseRegistry, RetrievalProvider};
use crate::domain::llm::ProviderResolver;
use crate::domain::workflow::{
    ExecutionContext, NodeKind, ScriptSandbox, StreamFragment, WorkflowError,
};
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClientTrait;

/// External collaborators available to node executors
#[derive(Debug, Clone)]
pub struct NodeServices {
    pub providers: Arc<dyn ProviderResolver>,
    pub retrieval: Arc<dyn RetrievalProvider>,
    pub knowledge_bases: Arc<dyn KnowledgeBaseRegistry>,
    pub http: Arc<dyn HttpClientTrait>,
    pub sandbox: Arc<dyn ScriptSandbox>,
}

/// Everything a node executor may read while it runs
#[derive(Debug)]
pub struct NodeContext<'a> {
    pub node_id: &'a str,
    pub context: &'a ExecutionContext,
    pub services: &'a NodeServices,
    /// Used when an LLM node leaves its model blank
    pub default_model: &'a str,
    pub stream: bool,
    pub fragments: Option<&'a mpsc::UnboundedSender<StreamFragment>>,
    pub cancellation: &'a CancellationToken,
}

impl NodeContext<'_> {
    /// Wrap a collaborator failure as a failure of this node
    pub fn fail(&self, err: DomainError) -> WorkflowError {
        WorkflowError::node_execution(self.node_id, err.to_string())
    }

    pub fn resolve(&self, template: &str) -> String {
        self.context.resolve_string(template)
    }
}

/// Run one node and return its result
pub async fn execute_node(kind: &NodeKind, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    match kind {
        NodeKind::Start => start_end::start(),
        NodeKind::End(_) => start_end::end(),
        NodeKind::Llm(config) => llm::execute(config, ctx).await,
        NodeKind::Rag(config) => rag::execute(config, ctx).await,
        NodeKind::Code(config) => code::execute(config, ctx).await,
        NodeKind::Condition(config) => condition::execute(config, ctx),
        NodeKind::HttpRequest(config) => http::execute(config, ctx).await,
        NodeKind::Variable(config) => variable::execute(config, ctx),
        NodeKind::Template(config) => template::execute(config, ctx),
    }
}

/// Evaluate a `{{...}}` expression; errors count as false
pub fn evaluate_expression(
    sandbox: &dyn ScriptSandbox,
    context: &ExecutionContext,
    expression: &str,
) -> bool {
    let resolved = context.resolve_string(expression);
    match sandbox.evaluate_condition(&resolved) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(expression = %resolved, error = %e, "Condition evaluation failed, treating as false");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::knowledge_base::MockRetrievalProvider;
    use crate::domain::llm::{MockLlmProvider, StaticProviderResolver};
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::knowledge_base::InMemoryKnowledgeBaseRegistry;
    use crate::infrastructure::sandbox::RhaiSandbox;

    pub fn services() -> NodeServices {
        NodeServices {
            providers: Arc::new(StaticProviderResolver::new(Arc::new(
                MockLlmProvider::new("mock").with_content("mock answer"),
            ))),
            retrieval: Arc::new(MockRetrievalProvider::new("")),
            knowledge_bases: Arc::new(InMemoryKnowledgeBaseRegistry::new()),
            http: Arc::new(MockHttpClient::new()),
            sandbox: Arc::new(RhaiSandbox::new()),
        }
    }

    pub fn node_context<'a>(
        node_id: &'a str,
        context: &'a ExecutionContext,
        services: &'a NodeServices,
        cancellation: &'a CancellationToken,
    ) -> NodeContext<'a> {
        NodeContext {
            node_id,
            context,
            services,
            default_model: "gpt-3.5-turbo",
            stream: false,
            fragments: None,
            cancellation,
        }
    }
}
