use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::NodeContext;
use crate::domain::workflow::{HttpRequestNode, WorkflowError};
use crate::infrastructure::http_client::OutboundRequest;

pub async fn execute(
    config: &HttpRequestNode,
    ctx: &NodeContext<'_>,
) -> Result<Value, WorkflowError> {
    let url = ctx.resolve(&config.url);
    let mut request =
        OutboundRequest::new(config.method, url, Duration::from_secs(config.timeout));

    for (name, value) in &config.headers {
        request = request.with_header(name.clone(), ctx.resolve(value));
    }

    if let Some(body) = config.body.as_ref().filter(|body| has_content(body)) {
        request = request.with_body(ctx.context.resolve_value(body));
    }

    debug!(node_id = ctx.node_id, method = %request.method, url = %request.url, "Sending request");

    let response = ctx
        .services
        .http
        .send(request)
        .await
        .map_err(|e| ctx.fail(e))?;

    let body = if response.is_json() {
        match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    node_id = ctx.node_id,
                    status = response.status,
                    error = %e,
                    "Response declared as JSON does not parse, keeping raw text"
                );
                Value::String(response.body.clone())
            }
        }
    } else {
        Value::String(response.body.clone())
    };

    let headers: Map<String, Value> = response
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    Ok(json!({
        "status_code": response.status,
        "headers": headers,
        "body": body,
    }))
}

/// Empty bodies are not sent
fn has_content(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::workflow::{ExecutionContext, HttpMethod};
    use crate::infrastructure::http_client::OutboundResponse;
    use crate::infrastructure::http_client::mock::MockHttpClient;
    use crate::infrastructure::workflow::nodes::NodeServices;
    use crate::infrastructure::workflow::nodes::test_support::{node_context, services};

    fn context() -> ExecutionContext {
        let inputs = json!({"user_id": "42", "token": "secret"});
        ExecutionContext::new(inputs.as_object().cloned().unwrap_or_default(), Map::new())
    }

    fn config(url: &str) -> HttpRequestNode {
        HttpRequestNode {
            url: url.to_string(),
            method: HttpMethod::Post,
            headers: BTreeMap::from([(
                "Authorization".to_string(),
                "Bearer {{token}}".to_string(),
            )]),
            body: Some(json!({"id": "{{user_id}}", "tags": ["{{user_id}}", 1]})),
            timeout: 10,
        }
    }

    #[tokio::test]
    async fn test_resolves_request_and_parses_json_reply() {
        let client = Arc::new(MockHttpClient::new().with_outbound(
            "https://api.test/users/42",
            OutboundResponse::new(201, r#"{"ok": true}"#)
                .with_header("content-type", "application/json"),
        ));
        let services = NodeServices {
            http: client.clone(),
            ..services()
        };
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("http_1", &context, &services, &token);

        let result = execute(&config("https://api.test/users/{{user_id}}"), &ctx)
            .await
            .unwrap();

        assert_eq!(result["status_code"], json!(201));
        assert_eq!(result["body"], json!({"ok": true}));
        assert_eq!(result["headers"]["content-type"], json!("application/json"));

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].timeout, Duration::from_secs(10));
        assert_eq!(
            sent[0].headers,
            vec![("Authorization".to_string(), "Bearer secret".to_string())]
        );
        assert_eq!(sent[0].body, Some(json!({"id": "42", "tags": ["42", 1]})));
    }

    #[tokio::test]
    async fn test_text_reply_and_error_status_are_results() {
        let client = Arc::new(MockHttpClient::new().with_outbound(
            "https://api.test/missing",
            OutboundResponse::new(404, "not here").with_header("content-type", "text/plain"),
        ));
        let services = NodeServices {
            http: client.clone(),
            ..services()
        };
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("http_1", &context, &services, &token);

        let mut node = config("https://api.test/missing");
        node.method = HttpMethod::Get;
        node.body = Some(json!({}));

        let result = execute(&node, &ctx).await.unwrap();
        assert_eq!(result["status_code"], json!(404));
        assert_eq!(result["body"], json!("not here"));
        assert_eq!(client.sent()[0].body, None);
    }

    #[tokio::test]
    async fn test_malformed_json_reply_keeps_raw_text() {
        let client = Arc::new(MockHttpClient::new().with_outbound(
            "https://api.test/broken",
            OutboundResponse::new(200, "{not json")
                .with_header("Content-Type", "application/json; charset=utf-8"),
        ));
        let services = NodeServices {
            http: client,
            ..services()
        };
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("http_1", &context, &services, &token);

        let result = execute(&config("https://api.test/broken"), &ctx).await.unwrap();
        assert_eq!(result["status_code"], json!(200));
        assert_eq!(result["body"], json!("{not json"));
    }

    #[tokio::test]
    async fn test_transport_error_fails_node() {
        let client = Arc::new(
            MockHttpClient::new().with_error("https://api.test/down", "connection refused"),
        );
        let services = NodeServices {
            http: client,
            ..services()
        };
        let context = context();
        let token = CancellationToken::new();
        let ctx = node_context("http_1", &context, &services, &token);

        let err = execute(&config("https://api.test/down"), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
