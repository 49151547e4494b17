use anyhow::{Context, Result};
use clap::Parser;
use lint_mcp::config::Config;
use lint_mcp::git::Git;
use lint_mcp::observer::{Observer, TracingObserver};
use lint_mcp::orchestrator::Orchestrator;
use lint_mcp::{changes, cli, mcp, util};
use serde_json::Value;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // stdout carries the MCP channel; logs go to stderr.
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config = Config::get().clone();
    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);

    match args.command {
        cli::Command::McpServe => {
            let orchestrator = Orchestrator::new(config, observer);
            mcp::serve(&orchestrator)
        }
        cli::Command::Request {
            params,
            params_file,
        } => {
            let params_raw = if let Some(path) = params_file {
                std::fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?
            } else {
                params
            };
            let arguments: Value =
                serde_json::from_str(&params_raw).context("parse request params")?;
            let orchestrator = Orchestrator::new(config, observer);
            let result = orchestrator.handle_value(Some(&arguments));
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        cli::Command::ChangedFiles { repo } => {
            let repo = match repo {
                Some(repo) => repo,
                None => std::env::current_dir().context("resolve current directory")?,
            };
            let repo = if repo.is_absolute() {
                repo
            } else {
                std::env::current_dir()?.join(repo)
            };
            let git = Git::new(
                util::clean_path(&repo),
                config.git_program.clone(),
                config.git_timeout(),
            );
            let changed = changes::collect_changes(&git, observer.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&changed)?);
            Ok(())
        }
    }
}
