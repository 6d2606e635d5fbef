use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use super::NodeContext;
use crate::domain::llm::{
    LlmEndpoint, LlmRequest, LlmResponseFormat, STRUCTURED_RESPONSE_NAME,
};
use crate::domain::workflow::{LlmNode, StreamFragment, WorkflowError};

pub async fn execute(config: &LlmNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    let request = build_request(config, ctx);
    let model = if config.model.trim().is_empty() {
        ctx.default_model
    } else {
        config.model.as_str()
    };

    let provider = ctx
        .services
        .providers
        .resolve(&endpoint(config))
        .await
        .map_err(|e| ctx.fail(e))?;

    debug!(
        node_id = ctx.node_id,
        model,
        provider = provider.provider_name(),
        messages = request.messages.len(),
        stream = ctx.stream,
        "Calling model"
    );

    if !ctx.stream {
        let response = provider.chat(model, request).await.map_err(|e| ctx.fail(e))?;
        return Ok(Value::String(response.content().to_string()));
    }

    let mut stream = provider
        .chat_stream(model, request)
        .await
        .map_err(|e| ctx.fail(e))?;

    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ctx.fail(e))?;
        let Some(delta) = chunk.delta.filter(|d| !d.is_empty()) else {
            continue;
        };

        if let Some(sink) = ctx.fragments {
            // A closed receiver only means nobody is watching
            let _ = sink.send(StreamFragment {
                node_id: ctx.node_id.to_string(),
                delta: delta.clone(),
            });
        }
        text.push_str(&delta);
    }

    Ok(Value::String(text))
}

fn build_request(config: &LlmNode, ctx: &NodeContext<'_>) -> LlmRequest {
    let system = ctx.resolve(&config.system_prompt);
    let user = ctx.resolve(&config.user_message);

    let mut builder = LlmRequest::builder()
        .temperature(config.temperature)
        .stream(ctx.stream);

    if !system.is_empty() {
        builder = builder.system(system);
    }
    if !user.is_empty() {
        builder = builder.user(user);
    }
    if let Some(max_tokens) = config.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }
    if config.enable_structured_output {
        if let Some(schema) = structured_schema(config, ctx.node_id) {
            builder = builder
                .response_format(LlmResponseFormat::strict_schema(STRUCTURED_RESPONSE_NAME, schema));
        }
    }

    builder.build()
}

/// The configured schema as an object; malformed schemas are dropped
fn structured_schema(config: &LlmNode, node_id: &str) -> Option<Value> {
    match config.structured_output_schema.as_ref()? {
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(schema @ Value::Object(_)) => Some(schema),
            Ok(_) => {
                warn!(node_id, "Structured output schema is not an object, ignoring it");
                None
            }
            Err(e) => {
                warn!(node_id, error = %e, "Malformed structured output schema, ignoring it");
                None
            }
        },
        schema @ Value::Object(_) => Some(schema.clone()),
        Value::Null => None,
        _ => {
            warn!(node_id, "Structured output schema is not an object, ignoring it");
            None
        }
    }
}

fn endpoint(config: &LlmNode) -> LlmEndpoint {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    LlmEndpoint {
        config_id: present(&config.config_id),
        base_url: present(&config.api_url),
        api_key: present(&config.api_key),
    }
}
