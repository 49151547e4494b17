//! Analyzer invocation: package scans and the per-file retry ladder.

use crate::config::Config;
use crate::error::LintError;
use crate::extract;
use crate::model::{AnalyzerOutput, DependencyMode, Issue, LintResult};
use crate::observer::Observer;
use crate::process;
use crate::util;
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

const COMPONENT: &str = "linter";

/// Characters of raw output quoted when no payload can be recovered.
pub const RAW_PREFIX_CHARS: usize = 200;

/// Command-line arguments for one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintArgs {
    pub vendored: bool,
    pub full_flags: bool,
    pub new_from_rev: Option<String>,
    pub targets: Vec<String>,
}

impl LintArgs {
    pub fn new(mode: DependencyMode, targets: Vec<String>) -> Self {
        Self {
            vendored: mode.is_vendored(),
            full_flags: false,
            new_from_rev: None,
            targets,
        }
    }

    pub fn with_full_flags(mut self) -> Self {
        self.full_flags = true;
        self
    }

    pub fn with_new_from_rev(mut self, rev: Option<&str>) -> Self {
        self.new_from_rev = rev
            .map(str::trim)
            .filter(|rev| !rev.is_empty())
            .map(str::to_string);
        self
    }

    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = vec!["run".to_string()];
        if self.vendored {
            argv.push("--modules-download-mode=vendor".to_string());
        }
        argv.push("--out-format".to_string());
        argv.push("json".to_string());
        if self.full_flags {
            argv.push("--print-issued-lines=false".to_string());
            argv.push("--print-linter-name=true".to_string());
        }
        if let Some(rev) = &self.new_from_rev {
            argv.push("--new-from-rev".to_string());
            argv.push(rev.clone());
        }
        argv.extend(self.targets.iter().cloned());
        argv
    }
}

/// Outcome of one analyzer run that produced output or exited cleanly.
#[derive(Debug, Default)]
pub struct Invocation {
    pub result: LintResult,
    /// Set when output was present but held no usable payload.
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    FullAbsolute,
    MinimalAbsolute,
    MinimalRelative,
}

impl Attempt {
    pub const LADDER: [Attempt; 3] = [
        Attempt::FullAbsolute,
        Attempt::MinimalAbsolute,
        Attempt::MinimalRelative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Attempt::FullAbsolute => "full flags, absolute path",
            Attempt::MinimalAbsolute => "minimal flags, absolute path",
            Attempt::MinimalRelative => "minimal flags, relative path",
        }
    }
}

#[derive(Debug, Default)]
pub struct LadderOutcome {
    pub issues: Vec<Issue>,
    pub attempts_run: Vec<Attempt>,
    pub winner: Option<Attempt>,
}

#[derive(Debug, Clone)]
pub struct Linter {
    program: String,
    timeout: Duration,
    max_scan_bytes: usize,
}

impl Linter {
    pub fn new(program: impl Into<String>, timeout: Duration, max_scan_bytes: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            max_scan_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.linter_program.clone(),
            config.lint_timeout(),
            config.max_scan_bytes,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Probe `<program> --version`; only a missing executable is an error.
    pub fn ensure_installed(&self, observer: &dyn Observer) -> Result<(), LintError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version");
        match process::run_with_timeout(cmd, self.timeout) {
            Ok(captured) => {
                observer.debug(
                    COMPONENT,
                    &format!(
                        "{} --version: {} ({})",
                        self.program,
                        captured.combined().trim(),
                        captured.describe_status()
                    ),
                );
                Ok(())
            }
            Err(err) => Err(self.spawn_error(err)),
        }
    }

    /// Run the analyzer in `root` with `args`.
    ///
    /// A non-zero exit with output is normal (the analyzer exits non-zero when it finds
    /// issues); only empty output together with a failed or timed out run is an error.
    pub fn invoke(
        &self,
        root: &Path,
        args: &LintArgs,
        observer: &dyn Observer,
    ) -> Result<Invocation, LintError> {
        let argv = args.to_argv();
        observer.info(
            COMPONENT,
            &format!("running {} {} in {}", self.program, argv.join(" "), root.display()),
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&argv).current_dir(root);
        let captured = process::run_with_timeout(cmd, self.timeout).map_err(|err| self.spawn_error(err))?;
        let output = captured.combined();
        observer.debug(
            COMPONENT,
            &format!(
                "{} finished: {}, {} bytes of output in {:?}",
                self.program,
                captured.describe_status(),
                output.len(),
                captured.elapsed
            ),
        );

        if output.is_empty() {
            if captured.success() {
                return Ok(Invocation::default());
            }
            return Err(LintError::ToolInvocation {
                program: self.program.clone(),
                message: captured.describe_status(),
            });
        }
        if !captured.success() {
            observer.debug(
                COMPONENT,
                "non-zero exit with output, treating as findings",
            );
        }

        Ok(self.decode(&output, observer))
    }

    fn decode(&self, output: &str, observer: &dyn Observer) -> Invocation {
        let payload = extract::extract_bounded(output, self.max_scan_bytes);
        if payload.is_empty() {
            observer.warn(COMPONENT, "no JSON payload in analyzer output");
            return Invocation {
                result: LintResult::new(),
                diagnostic: Some(format!(
                    "could not extract JSON from golangci-lint output\nfirst {RAW_PREFIX_CHARS} characters of raw output: {}",
                    util::truncate_chars(output, RAW_PREFIX_CHARS)
                )),
            };
        }

        match serde_json::from_str::<AnalyzerOutput>(&payload) {
            Ok(parsed) => {
                observer.info(COMPONENT, &format!("parsed {} issues", parsed.issues.len()));
                Invocation {
                    result: LintResult {
                        issues: parsed.issues,
                    },
                    diagnostic: None,
                }
            }
            Err(err) => {
                observer.warn(COMPONENT, &format!("decoding analyzer payload failed: {err}"));
                Invocation {
                    result: LintResult::new(),
                    diagnostic: Some(format!(
                        "could not decode golangci-lint JSON output: {err}"
                    )),
                }
            }
        }
    }

    /// One invocation over every package of a project.
    pub fn lint_packages(
        &self,
        root: &Path,
        packages: &[String],
        mode: DependencyMode,
        new_from_rev: Option<&str>,
        observer: &dyn Observer,
    ) -> Result<Invocation, LintError> {
        let args = LintArgs::new(mode, packages.to_vec())
            .with_full_flags()
            .with_new_from_rev(new_from_rev);
        self.invoke(root, &args, observer)
    }

    /// Lint one file with the retry ladder.
    ///
    /// Stops at the first attempt with findings. Attempt failures are observed and the
    /// ladder moves on; only a missing analyzer aborts it.
    pub fn lint_file(
        &self,
        root: &Path,
        file: &Path,
        mode: DependencyMode,
        observer: &dyn Observer,
    ) -> Result<LadderOutcome, LintError> {
        let mut outcome = LadderOutcome::default();
        let absolute = file.to_string_lossy().to_string();

        for attempt in Attempt::LADDER {
            let args = match attempt {
                Attempt::FullAbsolute => LintArgs::new(mode, vec![absolute.clone()]).with_full_flags(),
                Attempt::MinimalAbsolute => LintArgs::new(mode, vec![absolute.clone()]),
                Attempt::MinimalRelative => match util::relative_within(root, file) {
                    Some(relative) => LintArgs::new(mode, vec![relative]),
                    None => {
                        observer.debug(
                            COMPONENT,
                            &format!("{} is outside {}, skipping relative attempt", file.display(), root.display()),
                        );
                        continue;
                    }
                },
            };

            outcome.attempts_run.push(attempt);
            match self.invoke(root, &args, observer) {
                Ok(invocation) if !invocation.result.is_empty() => {
                    observer.info(
                        COMPONENT,
                        &format!(
                            "{}: {} issues ({})",
                            file.display(),
                            invocation.result.len(),
                            attempt.label()
                        ),
                    );
                    outcome.issues = invocation.result.issues;
                    outcome.winner = Some(attempt);
                    return Ok(outcome);
                }
                Ok(_) => {}
                Err(err @ LintError::ToolNotInstalled { .. }) => return Err(err),
                Err(err) => observer.warn(
                    COMPONENT,
                    &format!("{} attempt failed for {}: {err}", attempt.label(), file.display()),
                ),
            }
        }

        observer.info(
            COMPONENT,
            &format!(
                "{}: no issues after {} attempts (vendor mode: {})",
                file.display(),
                outcome.attempts_run.len(),
                mode.is_vendored()
            ),
        );
        Ok(outcome)
    }

    fn spawn_error(&self, err: io::Error) -> LintError {
        if err.kind() == io::ErrorKind::NotFound {
            LintError::ToolNotInstalled {
                program: self.program.clone(),
            }
        } else {
            LintError::io(format!("spawn {}", self.program), err)
        }
    }
}
