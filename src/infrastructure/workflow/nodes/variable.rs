use serde_json::{Number, Value};

use super::NodeContext;
use crate::domain::workflow::{VariableNode, VariableType, WorkflowError};

/// Value from the inputs, else the globals, else the configured default
pub fn execute(config: &VariableNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    let name = config.variable_name.as_str();
    let value = ctx
        .context
        .inputs()
        .get(name)
        .or_else(|| ctx.context.variables().get(name))
        .unwrap_or(&config.default_value);

    Ok(coerce(value, &config.variable_type))
}

/// Strings are converted to the declared type when they parse
fn coerce(value: &Value, variable_type: &VariableType) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let text = text.trim();

    let coerced = match variable_type {
        VariableType::Number => text
            .parse::<i64>()
            .ok()
            .map(|n| Value::Number(n.into()))
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            }),
        VariableType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(Value::Bool(true)),
            "false" | "0" | "no" => Some(Value::Bool(false)),
            _ => None,
        },
        VariableType::String | VariableType::Other(_) => None,
    };

    coerced.unwrap_or_else(|| value.clone())
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::workflow::ExecutionContext;
    use crate::infrastructure::workflow::nodes::test_support::{node_context, services};

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn run(config: &VariableNode, inputs: Value, variables: Value) -> Value {
        let context = ExecutionContext::new(object(inputs), object(variables));
        let services = services();
        let token = CancellationToken::new();
        let ctx = node_context("var", &context, &services, &token);
        execute(config, &ctx).unwrap()
    }

    fn node(name: &str, default: Value, variable_type: VariableType) -> VariableNode {
        VariableNode {
            variable_name: name.to_string(),
            default_value: default,
            variable_type,
        }
    }

    #[test]
    fn test_lookup_order() {
        let config = node("city", json!("nowhere"), VariableType::String);

        assert_eq!(
            run(&config, json!({"city": "Oslo"}), json!({"city": "Rome"})),
            json!("Oslo")
        );
        assert_eq!(run(&config, json!({}), json!({"city": "Rome"})), json!("Rome"));
        assert_eq!(run(&config, json!({}), json!({})), json!("nowhere"));
    }

    #[test]
    fn test_number_coercion() {
        let config = node("n", Value::Null, VariableType::Number);
        assert_eq!(run(&config, json!({"n": "42"}), json!({})), json!(42));
        assert_eq!(run(&config, json!({"n": "2.5"}), json!({})), json!(2.5));
        assert_eq!(run(&config, json!({"n": "many"}), json!({})), json!("many"));
        assert_eq!(run(&config, json!({"n": 7}), json!({})), json!(7));
    }

    #[test]
    fn test_boolean_coercion() {
        let config = node("flag", json!("false"), VariableType::Boolean);
        assert_eq!(run(&config, json!({"flag": "TRUE"}), json!({})), json!(true));
        assert_eq!(run(&config, json!({}), json!({})), json!(false));
        assert_eq!(run(&config, json!({"flag": "maybe"}), json!({})), json!("maybe"));
    }
}
