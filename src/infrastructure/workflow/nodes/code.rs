use std::time::Duration;

use serde_json::Value;

use super::NodeContext;
use crate::domain::workflow::{CodeNode, ScriptRequest, WorkflowError};

pub async fn execute(config: &CodeNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    let request = ScriptRequest::new(config.code.clone(), Duration::from_secs(config.timeout))
        .with_inputs(Value::Object(ctx.context.inputs().clone()))
        .with_results(Value::Object(ctx.context.node_results().to_map()))
        .with_context(ctx.context.snapshot())
        .with_cancellation(ctx.cancellation.clone());

    ctx.services.sandbox.run(request).await.map_err(|e| match e {
        WorkflowError::Timeout { timeout_ms, .. } => WorkflowError::timeout(ctx.node_id, timeout_ms),
        WorkflowError::Cancelled => WorkflowError::Cancelled,
        other => WorkflowError::node_execution(ctx.node_id, other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::workflow::ExecutionContext;
    use crate::infrastructure::workflow::nodes::test_support::{node_context, services};

    fn context() -> ExecutionContext {
        let inputs = json!({"items": [1, 2, 3]});
        let variables = json!({"factor": 10});
        let mut context = ExecutionContext::new(
            inputs.as_object().cloned().unwrap_or_default(),
            variables.as_object().cloned().unwrap_or_default(),
        );
        context.record_result("start", json!({"status": "started"}));
        context
    }

    #[tokio::test]
    async fn test_script_sees_bindings() {
        let services = services();
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("code_1", &context, &services, &token);

        let config = CodeNode {
            code: r#"
                let total = 0;
                for item in inputs.items { total += item; }
                output = #{
                    total: total * context.variables.factor,
                    started: results.start.status == "started"
                };
            "#
            .to_string(),
            timeout: 5,
        };

        assert_eq!(
            execute(&config, &ctx).await.unwrap(),
            json!({"total": 60, "started": true})
        );
    }

    #[tokio::test]
    async fn test_script_error_fails_node() {
        let services = services();
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("code_1", &context, &services, &token);

        let config = CodeNode {
            code: "output = undefined_thing + 1;".to_string(),
            timeout: 5,
        };

        let err = execute(&config, &ctx).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NodeExecution { ref node, .. } if node == "code_1"));
    }
}
