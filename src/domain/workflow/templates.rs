//! Built-in starter workflows

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::entity::{Edge, Node};
use super::node_types::{
    BranchCondition, ConditionNode, EndNode, LlmNode, NodeKind, RagNode, TemplateNode,
};

pub const TEMPLATE_NAMES: [&str; 3] = ["simple_chat", "rag_chat", "conditional_flow"];

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// A workflow skeleton a definition can be created from
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub variables: Map<String, Value>,
}

/// Look up a built-in template by name
pub fn builtin_template(name: &str) -> Option<WorkflowTemplate> {
    match name {
        "simple_chat" => Some(simple_chat()),
        "rag_chat" => Some(rag_chat()),
        "conditional_flow" => Some(conditional_flow()),
        _ => None,
    }
}

fn llm(system_prompt: &str, user_message: &str) -> NodeKind {
    NodeKind::Llm(LlmNode {
        api_url: Some(DEFAULT_API_URL.to_string()),
        system_prompt: system_prompt.to_string(),
        user_message: user_message.to_string(),
        ..LlmNode::default()
    })
}

fn end(mapping: &[(&str, &str)]) -> NodeKind {
    NodeKind::End(EndNode {
        output_mapping: mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    })
}

fn chain(ids: &[&str]) -> Vec<Edge> {
    ids.windows(2)
        .enumerate()
        .map(|(i, pair)| Edge::new(format!("e{}", i + 1), pair[0], pair[1]))
        .collect()
}

fn simple_chat() -> WorkflowTemplate {
    WorkflowTemplate {
        name: "Simple chat".to_string(),
        description: "A single language model call".to_string(),
        nodes: vec![
            Node::new("start", NodeKind::Start).with_position(100.0, 100.0),
            Node::new("llm_1", llm("You are a helpful assistant.", "{{user_input}}"))
                .with_position(300.0, 100.0),
            Node::new("end", end(&[("response", "{{llm_1}}")])).with_position(500.0, 100.0),
        ],
        edges: chain(&["start", "llm_1", "end"]),
        variables: Map::new(),
    }
}

fn rag_chat() -> WorkflowTemplate {
    WorkflowTemplate {
        name: "RAG chat".to_string(),
        description: "Answers questions from knowledge base context".to_string(),
        nodes: vec![
            Node::new("start", NodeKind::Start).with_position(100.0, 100.0),
            Node::new(
                "rag_1",
                NodeKind::Rag(RagNode {
                    kb_ids: Vec::new(),
                    query: "{{user_input}}".to_string(),
                    top_k: 3,
                }),
            )
            .with_position(300.0, 100.0),
            Node::new(
                "template_1",
                NodeKind::Template(TemplateNode {
                    template: "Answer the question using the context below.\n\n{{rag_1}}\n\nQuestion: {{user_input}}"
                        .to_string(),
                }),
            )
            .with_position(500.0, 100.0),
            Node::new(
                "llm_1",
                llm("You are a knowledge base assistant.", "{{template_1}}"),
            )
            .with_position(700.0, 100.0),
            Node::new(
                "end",
                end(&[("response", "{{llm_1}}"), ("context", "{{rag_1}}")]),
            )
            .with_position(900.0, 100.0),
        ],
        edges: chain(&["start", "rag_1", "template_1", "llm_1", "end"]),
        variables: Map::new(),
    }
}

fn conditional_flow() -> WorkflowTemplate {
    let branches = ["llm_admin", "llm_user", "llm_default"];

    let mut edges = vec![Edge::new("e1", "start", "condition_1")];
    for (i, branch) in branches.iter().enumerate() {
        edges.push(Edge::new(format!("e{}", i + 2), "condition_1", *branch));
        edges.push(Edge::new(format!("e{}", i + 5), *branch, "end"));
    }

    WorkflowTemplate {
        name: "Conditional flow".to_string(),
        description: "Routes the request by user type".to_string(),
        nodes: vec![
            Node::new("start", NodeKind::Start).with_position(100.0, 200.0),
            Node::new(
                "condition_1",
                NodeKind::Condition(ConditionNode {
                    conditions: vec![
                        BranchCondition {
                            condition: r#""{{user_type}}" == "admin""#.to_string(),
                            branch: "llm_admin".to_string(),
                        },
                        BranchCondition {
                            condition: r#""{{user_type}}" == "user""#.to_string(),
                            branch: "llm_user".to_string(),
                        },
                    ],
                    default_branch: Some("llm_default".to_string()),
                }),
            )
            .with_position(300.0, 200.0),
            Node::new("llm_admin", llm("You assist administrators.", "{{user_input}}"))
                .with_position(500.0, 100.0),
            Node::new("llm_user", llm("You assist regular users.", "{{user_input}}"))
                .with_position(500.0, 200.0),
            Node::new("llm_default", llm("You are a general assistant.", "{{user_input}}"))
                .with_position(500.0, 300.0),
            Node::new(
                "end",
                end(&[
                    ("branch", "{{condition_1}}"),
                    ("response", "{{llm_admin}}{{llm_user}}{{llm_default}}"),
                ]),
            )
            .with_position(700.0, 200.0),
        ],
        edges,
        // Branches that did not run resolve to empty text in the response
        variables: branches
            .iter()
            .map(|b| (b.to_string(), Value::String(String::new())))
            .collect(),
    }
}
