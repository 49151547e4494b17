use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Linter identifier used for findings produced by this tool rather than the analyzer.
pub const SYSTEM_LINTER: &str = "lint-mcp";
/// Filename carried by in-band diagnostics about configuration or environment problems.
pub const SYSTEM_FILENAME: &str = "system";
/// Linter identifier for diagnostics about a failed analyzer invocation.
pub const ANALYZER_LINTER: &str = "golangci-lint";
/// Filename carried by analyzer-invocation diagnostics.
pub const UNKNOWN_FILENAME: &str = "unknown";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Pos {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub line: i64,
    #[serde(default)]
    pub column: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Replacement {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_lines: Vec<String>,
}

/// One finding reported by the analyzer (or synthesized by this tool).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Issue {
    #[serde(default)]
    pub from_linter: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_lines: Vec<String>,
    #[serde(default)]
    pub replacement: Option<Replacement>,
    #[serde(default)]
    pub pos: Pos,
    #[serde(default)]
    pub expect_no_lint: bool,
    #[serde(default)]
    pub expected_no_lint_linter: String,
}

impl Issue {
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            from_linter: SYSTEM_LINTER.to_string(),
            text: message.into(),
            pos: Pos {
                filename: SYSTEM_FILENAME.to_string(),
                ..Pos::default()
            },
            ..Issue::default()
        }
    }

    pub fn analyzer(message: impl Into<String>) -> Self {
        Self {
            from_linter: ANALYZER_LINTER.to_string(),
            text: message.into(),
            pos: Pos {
                filename: UNKNOWN_FILENAME.to_string(),
                ..Pos::default()
            },
            ..Issue::default()
        }
    }
}

/// Ordered findings of one request, in discovery order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LintResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<Issue>,
}

impl LintResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue::system(message)],
        }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// The structured payload printed by `golangci-lint --out-format json`.
///
/// Only `Issues` is consumed; `Report` and friends are ignored.
#[derive(Debug, Deserialize, Default)]
pub struct AnalyzerOutput {
    #[serde(rename = "Issues", default, deserialize_with = "null_as_empty")]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Deserialize, Clone, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintRequest {
    /// Reference files (absolute paths). Used to locate the project when projectPath is
    /// absent, and as the package list for a full scan.
    #[serde(default)]
    pub files: Vec<String>,
    /// Project root (absolute path). Preferred starting point; ideally a git repository or a
    /// directory containing go.mod.
    #[serde(default)]
    pub project_path: Option<String>,
    /// Lint only changed files, detecting the change range automatically (unpushed commits,
    /// branch divergence point or working tree changes). Defaults to true.
    #[serde(default = "default_true")]
    pub check_only_changes: bool,
    /// Full scan only: report only issues introduced after this revision.
    #[serde(default)]
    pub new_from_rev: Option<String>,
}

fn default_true() -> bool {
    true
}

impl LintRequest {
    pub fn project_path(&self) -> Option<&str> {
        self.project_path
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn first_file(&self) -> Option<&str> {
        self.files
            .iter()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    /// True when neither a project path nor any usable file was supplied.
    pub fn missing_start(&self) -> bool {
        self.project_path().is_none() && self.first_file().is_none()
    }
}

/// Baseline chosen by the base-commit resolver.
///
/// An empty `baseline` means "working tree only".
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChangeScope {
    pub baseline: String,
    pub label: String,
}

impl ChangeScope {
    pub fn new(baseline: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            label: label.into(),
        }
    }

    pub fn working_tree(label: impl Into<String>) -> Self {
        Self::new(String::new(), label)
    }

    pub fn is_working_tree_only(&self) -> bool {
        self.baseline.is_empty()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DependencyMode {
    Vendored,
    Module,
}

impl DependencyMode {
    pub fn is_vendored(self) -> bool {
        matches!(self, DependencyMode::Vendored)
    }
}

/// Files of one project, together with the package identifiers they belong to.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ProjectGroup {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub packages: Vec<String>,
}

impl ProjectGroup {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            files: Vec::new(),
            packages: Vec::new(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
