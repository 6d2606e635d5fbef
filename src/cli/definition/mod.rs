//! Definition commands - validate files and print built-in templates

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use super::run::load_definition;
use crate::domain::workflow::templates::{TEMPLATE_NAMES, builtin_template};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Workflow definition (JSON)
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// One of simple_chat, rag_chat, conditional_flow
    pub name: String,
}

pub fn validate(args: ValidateArgs) -> anyhow::Result<()> {
    let workflow = load_definition(&args.path)?;
    workflow
        .validate()
        .with_context(|| format!("{} is not a valid workflow", args.path.display()))?;

    println!(
        "{}: workflow '{}' is valid ({} nodes, {} edges)",
        args.path.display(),
        workflow.id(),
        workflow.nodes().len(),
        workflow.edges().len()
    );
    Ok(())
}

pub fn template(args: TemplateArgs) -> anyhow::Result<()> {
    println!("{}", render_template(&args.name)?);
    Ok(())
}

fn render_template(name: &str) -> anyhow::Result<String> {
    let template = builtin_template(name).with_context(|| {
        format!(
            "Unknown template '{}'; available: {}",
            name,
            TEMPLATE_NAMES.join(", ")
        )
    })?;

    Ok(serde_json::to_string_pretty(&template)?)
}
