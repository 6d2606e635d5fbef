use clap::Parser;
use pmp_workflow_engine::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Run(args) => cli::run::run(args).await,
        Command::Validate(args) => cli::definition::validate(args),
        Command::Template(args) => cli::definition::template(args),
    }
}
