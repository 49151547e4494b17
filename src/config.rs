// Configuration module for lint-mcp
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Analyzer executable (LINT_MCP_LINTER)
    pub linter_program: String,

    /// Version-control executable (LINT_MCP_GIT)
    pub git_program: String,

    /// Deadline for one analyzer invocation in seconds (LINT_MCP_LINT_TIMEOUT_SECS)
    pub lint_timeout_secs: u64,

    /// Deadline for one version-control query in seconds (LINT_MCP_GIT_TIMEOUT_SECS)
    pub git_timeout_secs: u64,

    /// Bytes of analyzer output examined by the brace-balance scan (LINT_MCP_MAX_SCAN_BYTES)
    pub max_scan_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            linter_program: "golangci-lint".to_string(),
            git_program: "git".to_string(),
            lint_timeout_secs: 300,
            git_timeout_secs: 30,
            max_scan_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var("LINT_MCP_LINTER") {
            if !val.trim().is_empty() {
                config.linter_program = val.trim().to_string();
            }
        }

        if let Ok(val) = env::var("LINT_MCP_GIT") {
            if !val.trim().is_empty() {
                config.git_program = val.trim().to_string();
            }
        }

        parse_var("LINT_MCP_LINT_TIMEOUT_SECS", &mut config.lint_timeout_secs);
        parse_var("LINT_MCP_GIT_TIMEOUT_SECS", &mut config.git_timeout_secs);
        parse_var("LINT_MCP_MAX_SCAN_BYTES", &mut config.max_scan_bytes);

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }

    pub fn lint_timeout(&self) -> Duration {
        Duration::from_secs(self.lint_timeout_secs.max(1))
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs.max(1))
    }
}

fn parse_var<T>(name: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(name) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!("invalid {name} value: {val}, using default: {slot}"),
    }
}
