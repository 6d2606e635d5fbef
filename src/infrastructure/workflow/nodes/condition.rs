use serde_json::Value;
use tracing::debug;

use super::{NodeContext, evaluate_expression};
use crate::domain::workflow::{ConditionNode, WorkflowError};

/// Name of the first branch whose condition holds, else the default branch
pub fn execute(config: &ConditionNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    let sandbox = ctx.services.sandbox.as_ref();

    for candidate in &config.conditions {
        if evaluate_expression(sandbox, ctx.context, &candidate.condition) {
            debug!(node_id = ctx.node_id, branch = %candidate.branch, "Condition matched");
            return Ok(Value::String(candidate.branch.clone()));
        }
    }

    Ok(config
        .default_branch
        .clone()
        .map(Value::String)
        .unwrap_or(Value::Null))
}
