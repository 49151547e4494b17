use std::path::PathBuf;
use thiserror::Error;

pub const INSTALL_HINT: &str = "golangci-lint is not installed. Install golangci-lint v1.52.2 first:

Option 1 - go install:
go install github.com/golangci/golangci-lint/cmd/golangci-lint@v1.52.2

Option 2 - package manager:
# macOS (Homebrew)
brew install golangci-lint
brew pin golangci-lint && brew install golangci-lint@1.52.2

Option 3 - install script:
curl -sSfL https://raw.githubusercontent.com/golangci/golangci-lint/master/install.sh | sh -s -- -b $(go env GOPATH)/bin v1.52.2

Make sure golangci-lint is on PATH afterwards.";

#[derive(Debug, Error)]
pub enum LintError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no changed Go files found (working tree and commit range are both empty)")]
    NoChangesFound,

    #[error("no valid Go packages found")]
    NoValidPackages,

    #[error("no Go files found under {}", .0.display())]
    NoSourceFiles(PathBuf),

    #[error("change detection failed (start: {}): {detection}\nfallback file scan also failed: {fallback}\n\nProvide projectPath or files to pin down the project location.", .base.display())]
    ChangeDetection {
        base: PathBuf,
        detection: Box<LintError>,
        fallback: Box<LintError>,
    },

    #[error("{program} failed: {message}")]
    ToolInvocation { program: String, message: String },

    #[error("{}", INSTALL_HINT)]
    ToolNotInstalled { program: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LintError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LintError::InvalidArgument(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LintError::Io {
            context: context.into(),
            source,
        }
    }
}
