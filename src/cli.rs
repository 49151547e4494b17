use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lint-mcp",
    version,
    about = "golangci-lint for changed Go files, over MCP",
    after_help = r#"Examples:
  lint-mcp mcp-serve
  lint-mcp request --params '{"projectPath":"/path/to/project"}'
  lint-mcp request --params '{"checkOnlyChanges":false,"files":["/path/to/project/a/a.go"]}'
  lint-mcp changed-files --repo /path/to/project
"#
)]
pub struct Args {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the MCP tool server over stdin/stdout.
    McpServe,
    /// Run a single lint request and print the result payload.
    Request {
        #[arg(long, default_value = "{}")]
        params: String,
        #[arg(long, value_name = "PATH")]
        params_file: Option<PathBuf>,
    },
    /// Show the resolved change scope and changed Go files.
    ChangedFiles {
        #[arg(long)]
        repo: Option<PathBuf>,
    },
}
