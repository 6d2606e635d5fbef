use serde_json::{Value, json};

use crate::domain::workflow::WorkflowError;

pub fn start() -> Result<Value, WorkflowError> {
    Ok(json!({"status": "started"}))
}

pub fn end() -> Result<Value, WorkflowError> {
    Ok(json!({"status": "completed"}))
}
