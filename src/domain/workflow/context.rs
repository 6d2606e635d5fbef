//! Workflow execution context and placeholder resolution
//!
//! Templates reference values with `{{name}}`. A name is looked up, first
//! match wins, in:
//! 1. the results of nodes executed so far (by node identifier)
//! 2. the caller-supplied inputs
//! 3. the definition's global variables
//!
//! A dotted name (`{{http_1.body.id}}`) that matches no scope verbatim is
//! walked as a path into the first scope holding its head segment.
//! Unknown names are left in place untouched.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value, json};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").unwrap());

/// Results of executed nodes, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeResults {
    values: HashMap<String, Value>,
    order: Vec<String>,
}

impl NodeResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node_id: impl Into<String>, value: Value) {
        let node_id = node_id.into();
        if self.values.insert(node_id.clone(), value).is_none() {
            self.order.push(node_id);
        }
    }

    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.values.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.values.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Node identifiers in the order they completed
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.order
            .iter()
            .filter_map(|id| self.values.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }

    pub fn into_parts(self) -> (HashMap<String, Value>, Vec<String>) {
        (self.values, self.order)
    }
}

/// State of one workflow run
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    inputs: Map<String, Value>,
    variables: Map<String, Value>,
    node_results: NodeResults,
}

impl ExecutionContext {
    pub fn new(inputs: Map<String, Value>, variables: Map<String, Value>) -> Self {
        Self {
            inputs,
            variables,
            node_results: NodeResults::new(),
        }
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn node_results(&self) -> &NodeResults {
        &self.node_results
    }

    pub fn record_result(&mut self, node_id: impl Into<String>, value: Value) {
        self.node_results.record(node_id, value);
    }

    pub fn into_node_results(self) -> NodeResults {
        self.node_results
    }

    /// `{inputs, variables, outputs}` as exposed to scripts.
    /// Run outputs are only collected after traversal, so `outputs` is always empty here.
    pub fn snapshot(&self) -> Value {
        json!({
            "inputs": self.inputs,
            "variables": self.variables,
            "outputs": {},
        })
    }

    /// Look a name up across node results, inputs and variables
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.node_results
            .get(name)
            .or_else(|| self.inputs.get(name))
            .or_else(|| self.variables.get(name))
            .or_else(|| self.lookup_path(name))
    }

    fn lookup_path(&self, name: &str) -> Option<&Value> {
        let (head, rest) = name.split_once('.')?;
        let root = self
            .node_results
            .get(head)
            .or_else(|| self.inputs.get(head))
            .or_else(|| self.variables.get(head))?;
        get_nested_field(root, rest)
    }

    /// Replace every resolvable `{{name}}` in a template
    pub fn resolve_string(&self, template: &str) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }

        PLACEHOLDER_PATTERN
            .replace_all(template, |caps: &Captures| {
                match self.lookup(caps[1].trim()) {
                    Some(value) => value_to_string(value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Resolve every string leaf of a structured value
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve_string(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve_value(v)).collect()),
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Check if a string contains any placeholders
    pub fn has_placeholders(template: &str) -> bool {
        PLACEHOLDER_PATTERN.is_match(template)
    }

    /// Names referenced by a template, trimmed, in order of appearance
    pub fn placeholders(template: &str) -> Vec<String> {
        PLACEHOLDER_PATTERN
            .captures_iter(template)
            .map(|caps| caps[1].trim().to_string())
            .collect()
    }
}

/// Get a nested field from a JSON value using dot notation
fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Textual form of a value as substituted into templates
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),

        // For arrays and objects, use JSON representation
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
