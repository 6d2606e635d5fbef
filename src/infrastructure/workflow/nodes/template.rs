use serde_json::Value;

use super::NodeContext;
use crate::domain::workflow::{TemplateNode, WorkflowError};

pub fn execute(config: &TemplateNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    Ok(Value::String(ctx.resolve(&config.template)))
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::workflow::ExecutionContext;
    use crate::infrastructure::workflow::nodes::test_support::{node_context, services};

    fn render(template: &str, inputs: Value) -> Value {
        let inputs = inputs.as_object().cloned().unwrap_or_default();
        let context = ExecutionContext::new(inputs, Map::new());
        let services = services();
        let token = CancellationToken::new();
        let ctx = node_context("tpl", &context, &services, &token);

        execute(&TemplateNode { template: template.to_string() }, &ctx).unwrap()
    }

    #[test]
    fn test_renders_known_names() {
        assert_eq!(render("Hello {{name}}", json!({"name": "Ada"})), json!("Hello Ada"));
    }

    #[test]
    fn test_unknown_names_stay_literal() {
        assert_eq!(render("Hello {{name}}", json!({})), json!("Hello {{name}}"));
    }
}
