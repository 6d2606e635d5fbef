//! Run command - executes a workflow and prints the result

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{ExecutionOptions, ExecutionResult, Workflow, WorkflowExecutor};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Identifier of a stored workflow
    #[arg(required_unless_present = "file")]
    pub workflow_id: Option<String>,

    /// Run a definition file instead of a stored workflow
    #[arg(long, conflicts_with = "workflow_id")]
    pub file: Option<PathBuf>,

    /// Input value as KEY=VALUE; VALUE is parsed as JSON when it can be
    #[arg(long = "input", value_name = "KEY=VALUE")]
    pub inputs: Vec<String>,

    /// Inputs as a JSON object, merged before any --input
    #[arg(long)]
    pub inputs_json: Option<String>,

    /// Stream model output to stderr as it arrives
    #[arg(long)]
    pub stream: bool,

    /// Upper bound for the whole run
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let inputs = collect_inputs(args.inputs_json.as_deref(), &args.inputs)?;

    let cancellation = CancellationToken::new();
    let mut options = ExecutionOptions::new()
        .with_stream(args.stream)
        .with_cancellation(cancellation.clone());

    if let Some(secs) = args.timeout_secs.filter(|secs| *secs > 0) {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let printer = if args.stream {
        let (tx, rx) = mpsc::unbounded_channel();
        options = options.with_fragments(tx);
        Some(tokio::spawn(print_fragments(rx)))
    } else {
        None
    };

    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    let result = match (&args.file, &args.workflow_id) {
        (Some(path), _) => {
            let workflow = load_definition(path)?;
            info!(workflow_id = %workflow.id(), path = %path.display(), "Running definition file");
            let engine = crate::create_engine(&config).await?;
            engine.execute(&workflow, inputs, options).await
        }
        (None, Some(workflow_id)) => {
            let service = crate::create_workflow_service(&config).await?;
            service.execute(workflow_id, inputs, options).await?
        }
        (None, None) => bail!("Either a workflow id or --file is required"),
    };

    if let Some(printer) = printer {
        let _ = printer.await;
        eprintln!();
    }

    print_result(&result)
}

/// Merge `--inputs-json` and `--input KEY=VALUE` pairs; later pairs win
pub fn collect_inputs(json: Option<&str>, pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut inputs = match json {
        Some(json) => match serde_json::from_str::<Value>(json).context("Invalid --inputs-json")? {
            Value::Object(map) => map,
            other => bail!("--inputs-json must be a JSON object, got {}", other),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let (key, value) = parse_input(pair)?;
        inputs.insert(key, value);
    }

    Ok(inputs)
}

fn parse_input(pair: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("Invalid --input '{}': expected KEY=VALUE", pair);
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid --input '{}': empty key", pair);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub fn load_definition(path: &Path) -> anyhow::Result<Workflow> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    serde_json::from_str(&text).with_context(|| format!("Invalid workflow definition in {}", path.display()))
}

async fn print_fragments(mut rx: mpsc::UnboundedReceiver<crate::domain::workflow::StreamFragment>) {
    let mut stderr = std::io::stderr();
    while let Some(fragment) = rx.recv().await {
        let _ = write!(stderr, "{}", fragment.delta);
        let _ = stderr.flush();
    }
}

fn print_result(result: &ExecutionResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);

    if !result.is_success() {
        bail!(
            "Workflow '{}' failed: {}",
            result.workflow_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pairs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_input_values_parse_as_json_when_possible() {
        let inputs = collect_inputs(
            None,
            &pairs(&["name=Ada", "count=3", "flags=[true]", "quoted=\"7\"", "eq=a=b"]),
        )
        .unwrap();

        assert_eq!(inputs["name"], json!("Ada"));
        assert_eq!(inputs["count"], json!(3));
        assert_eq!(inputs["flags"], json!([true]));
        assert_eq!(inputs["quoted"], json!("7"));
        assert_eq!(inputs["eq"], json!("a=b"));
    }

    #[test]
    fn test_pairs_override_json() {
        let inputs = collect_inputs(Some(r#"{"name": "Bob", "age": 40}"#), &pairs(&["name=Ada"]))
            .unwrap();

        assert_eq!(inputs["name"], json!("Ada"));
        assert_eq!(inputs["age"], json!(40));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(collect_inputs(Some("[1, 2]"), &[]).is_err());
        assert!(collect_inputs(Some("{"), &[]).is_err());
        assert!(collect_inputs(None, &pairs(&["novalue"])).is_err());
        assert!(collect_inputs(None, &pairs(&["=x"])).is_err());
    }

    #[test]
    fn test_load_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        std::fs::write(
            &path,
            json!({
                "workflow_id": "flow",
                "name": "Flow",
                "nodes": [{"node_id": "start", "node_type": "start"}]
            })
            .to_string(),
        )
        .unwrap();

        let workflow = load_definition(&path).unwrap();
        assert_eq!(workflow.id().as_str(), "flow");
        assert_eq!(workflow.nodes().len(), 1);

        assert!(load_definition(&dir.path().join("missing.json")).is_err());
    }
}
