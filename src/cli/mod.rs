//! Command line interface
//!
//! - `serve`: HTTP API
//! - `run`: execute a stored workflow or a definition file
//! - `validate`: check a definition file
//! - `template`: print a built-in template

pub mod definition;
pub mod run;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Workflow Engine - runs graphs of LLM, retrieval, script and HTTP nodes
#[derive(Parser)]
#[command(name = "pmp-workflow-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Execute a workflow and print the result as JSON
    Run(run::RunArgs),

    /// Parse and validate a workflow definition file
    Validate(definition::ValidateArgs),

    /// Print a built-in workflow template
    Template(definition::TemplateArgs),
}

/// `.env`, configuration files and the global subscriber
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
