//! Read-only git query surface.
//!
//! Every query shells out to the `git` binary with the project directory as working
//! directory and a per-query deadline. None of them mutate the repository.

use crate::process::{self, Captured};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
    program: String,
    timeout: Duration,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            program: program.into(),
            timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `rev-parse --abbrev-ref HEAD`; `HEAD` when detached.
    pub fn current_branch(&self) -> Result<String> {
        self.output(&["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|out| out.trim().to_string())
    }

    pub fn ref_exists(&self, reference: &str) -> bool {
        self.captured(&["rev-parse", "--verify", "--quiet", reference])
            .map(|captured| captured.success())
            .unwrap_or(false)
    }

    /// Number of commits in `range` (e.g. `origin/main..HEAD`).
    pub fn rev_count(&self, range: &str) -> Result<u64> {
        let out = self.output(&["rev-list", "--count", range])?;
        out.trim()
            .parse()
            .with_context(|| format!("parse rev-list count {:?}", out.trim()))
    }

    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let out = self.output(&["merge-base", a, b])?;
        let sha = out.trim();
        anyhow::ensure!(!sha.is_empty(), "git merge-base {a} {b} returned nothing");
        Ok(sha.to_string())
    }

    pub fn status_porcelain(&self) -> Result<String> {
        self.output(&["status", "--porcelain"])
    }

    /// Unstaged modifications, relative to the working directory.
    pub fn diff_unstaged(&self) -> Result<Vec<String>> {
        self.lines(&["diff", "--name-only", "--relative"])
    }

    pub fn diff_staged(&self) -> Result<Vec<String>> {
        self.lines(&["diff", "--name-only", "--relative", "--cached"])
    }

    pub fn diff_range(&self, base: &str, head: &str) -> Result<Vec<String>> {
        self.lines(&["diff", "--name-only", "--relative", base, head])
    }

    pub fn untracked(&self) -> Result<Vec<String>> {
        self.lines(&["ls-files", "--others", "--exclude-standard"])
    }

    /// Target of `refs/remotes/origin/HEAD`, e.g. `refs/remotes/origin/main`.
    pub fn remote_default_ref(&self) -> Result<String> {
        self.output(&["symbolic-ref", "refs/remotes/origin/HEAD"])
            .map(|out| out.trim().to_string())
    }

    pub fn reflog(&self, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        self.lines(&["reflog", "--oneline", "-n", &limit])
    }

    fn captured(&self, args: &[&str]) -> Result<Captured> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.root);
        process::run_with_timeout(cmd, self.timeout)
            .with_context(|| format!("run {} {}", self.program, args.join(" ")))
    }

    fn output(&self, args: &[&str]) -> Result<String> {
        let captured = self.captured(args)?;
        if !captured.success() {
            anyhow::bail!(
                "git {} failed ({}): {}",
                args.join(" "),
                captured.describe_status(),
                captured.stderr_text().trim()
            );
        }
        Ok(captured.stdout_text())
    }

    fn lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let out = self.output(args)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Source branch of a reflog checkout entry whose destination is `branch`.
///
/// Matches lines like `abc1234 HEAD@{3}: checkout: moving from main to feature`.
pub fn checkout_source<'a>(line: &'a str, branch: &str) -> Option<&'a str> {
    let (_, rest) = line.split_once("checkout: moving from ")?;
    let (source, target) = rest.split_once(" to ")?;
    let source = source.trim();
    if target.trim() != branch || source.is_empty() || source == branch {
        return None;
    }
    Some(source)
}
