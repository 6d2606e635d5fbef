use serde_json::Value;
use tracing::{debug, warn};

use super::NodeContext;
use crate::domain::workflow::{RagNode, WorkflowError};

pub async fn execute(config: &RagNode, ctx: &NodeContext<'_>) -> Result<Value, WorkflowError> {
    let query = ctx.resolve(&config.query);

    let mut documents: Vec<String> = Vec::new();
    for kb_id in &config.kb_ids {
        let kb = ctx
            .services
            .knowledge_bases
            .get(kb_id)
            .await
            .map_err(|e| ctx.fail(e))?;

        match kb {
            Some(kb) => {
                for file in kb.files {
                    if !documents.contains(&file) {
                        documents.push(file);
                    }
                }
            }
            None => warn!(node_id = ctx.node_id, kb_id = %kb_id, "Unknown knowledge base"),
        }
    }

    if documents.is_empty() {
        debug!(node_id = ctx.node_id, "No documents to search");
        return Ok(Value::String(String::new()));
    }

    let passages = ctx
        .services
        .retrieval
        .query(&query, &documents, config.top_k)
        .await
        .map_err(|e| ctx.fail(e))?;

    Ok(Value::String(passages))
}
