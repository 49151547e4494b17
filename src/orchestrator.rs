//! Request orchestration: one request in, one result payload out.
//!
//! `handle` is the only recovery point. Typed errors and panics raised anywhere below it
//! become a single `lint-mcp` / `system` diagnostic issue, so callers always get a
//! well-formed payload back.

use crate::changes;
use crate::config::Config;
use crate::deps;
use crate::error::LintError;
use crate::git::Git;
use crate::linter::Linter;
use crate::model::{Issue, LintRequest, LintResult};
use crate::observer::Observer;
use crate::project;
use crate::util;
use serde_json::Value;
use std::any::Any;
use std::convert::Infallible;
use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const COMPONENT: &str = "orchestrator";

pub const MISSING_START: &str = "missing project starting point: provide projectPath (absolute path of the project root, preferred) or files (absolute path of any file inside the project). Example: {\"projectPath\":\"/Users/you/path/to/project\"}";

pub struct Orchestrator {
    config: Config,
    observer: Arc<dyn Observer>,
}

impl Orchestrator {
    pub fn new(config: Config, observer: Arc<dyn Observer>) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handle(&self, request: &LintRequest) -> Result<LintResult, Infallible> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(request)));
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                let message = err.to_string();
                self.report(&format!("request failed: {message}"));
                LintResult::diagnostic(message)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.report(&format!("panic while handling request: {message}"));
                LintResult::diagnostic(format!("internal error: {message}"))
            }
        };
        Ok(result)
    }

    /// Logs from the recovery point itself; a panicking observer must not unwind past it.
    fn report(&self, message: &str) {
        let observer = &*self.observer;
        let _ = panic::catch_unwind(AssertUnwindSafe(|| observer.error(COMPONENT, message)));
    }

    /// Handle raw tool arguments; absent arguments behave like `{}`.
    pub fn handle_value(&self, arguments: Option<&Value>) -> LintResult {
        let value = arguments
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let request = match serde_json::from_value::<LintRequest>(value) {
            Ok(request) => request,
            Err(err) => {
                return LintResult::diagnostic(format!("invalid request arguments: {err}"));
            }
        };
        let Ok(result) = self.handle(&request);
        result
    }

    fn run(&self, request: &LintRequest) -> Result<LintResult, LintError> {
        let observer = &*self.observer;
        observer.info(
            COMPONENT,
            &format!(
                "request: projectPath={:?} files={} checkOnlyChanges={} newFromRev={:?}",
                request.project_path(),
                request.files.len(),
                request.check_only_changes,
                request.new_from_rev
            ),
        );

        if request.missing_start() {
            return Ok(LintResult::diagnostic(MISSING_START));
        }

        let base_dir = resolve_base_dir(request, observer)?;
        observer.info(COMPONENT, &format!("base directory: {}", base_dir.display()));

        let linter = Linter::from_config(&self.config);
        linter.ensure_installed(observer)?;

        if request.check_only_changes {
            self.lint_changes(&base_dir, &linter)
        } else {
            self.lint_full(request, &linter)
        }
    }

    fn lint_changes(&self, base_dir: &Path, linter: &Linter) -> Result<LintResult, LintError> {
        let observer = &*self.observer;
        let git = Git::new(
            base_dir,
            self.config.git_program.clone(),
            self.config.git_timeout(),
        );

        let files: Vec<PathBuf> = match changes::collect_changes(&git, observer) {
            Ok(set) => set.files.into_iter().collect(),
            Err(detection) => {
                observer.warn(
                    COMPONENT,
                    &format!("change detection failed ({detection}), scanning the whole tree"),
                );
                match changes::scan_source_files(base_dir, observer) {
                    Ok(files) => files,
                    Err(fallback) => {
                        return Err(LintError::ChangeDetection {
                            base: base_dir.to_path_buf(),
                            detection: Box::new(detection),
                            fallback: Box::new(fallback),
                        });
                    }
                }
            }
        };
        observer.info(COMPONENT, &format!("{} files to lint", files.len()));

        let mut result = LintResult::new();
        for group in project::partition(&files, observer)? {
            let mode = deps::detect_mode(&group.root, observer);
            observer.info(
                COMPONENT,
                &format!(
                    "project {}: {} changed files, vendor mode {}",
                    group.root.display(),
                    group.files.len(),
                    mode.is_vendored()
                ),
            );
            for file in &group.files {
                let outcome = linter.lint_file(&group.root, file, mode, observer)?;
                result.extend(outcome.issues);
            }
        }
        Ok(result)
    }

    fn lint_full(&self, request: &LintRequest, linter: &Linter) -> Result<LintResult, LintError> {
        let observer = &*self.observer;
        let files: Vec<PathBuf> = request
            .files
            .iter()
            .map(|file| file.trim())
            .filter(|file| !file.is_empty())
            .map(PathBuf::from)
            .collect();

        let mut result = LintResult::new();
        for group in project::partition(&files, observer)? {
            let mode = deps::detect_mode(&group.root, observer);
            observer.info(
                COMPONENT,
                &format!("project {}: packages {:?}", group.root.display(), group.packages),
            );
            match linter.lint_packages(
                &group.root,
                &group.packages,
                mode,
                request.new_from_rev.as_deref(),
                observer,
            ) {
                Ok(invocation) => {
                    result.extend(invocation.result.issues);
                    if let Some(diagnostic) = invocation.diagnostic {
                        result.push(Issue::analyzer(diagnostic));
                    }
                }
                Err(err @ LintError::ToolNotInstalled { .. }) => return Err(err),
                Err(err) => {
                    observer.warn(
                        COMPONENT,
                        &format!("project {} failed: {err}", group.root.display()),
                    );
                    result.push(Issue::analyzer(format!(
                        "golangci-lint run failed\nproject: {}\ntargets: {:?}\nvendor mode: {}\nerror: {err}",
                        group.root.display(),
                        group.packages,
                        mode.is_vendored()
                    )));
                }
            }
        }
        Ok(result)
    }
}

/// Starting directory: projectPath, else the project of the first file, else the cwd.
pub fn resolve_base_dir(request: &LintRequest, observer: &dyn Observer) -> Result<PathBuf, LintError> {
    if let Some(raw) = request.project_path() {
        let path = Path::new(raw);
        if !path.is_absolute() {
            return Err(LintError::invalid(format!(
                "projectPath must be an absolute path: {raw}"
            )));
        }
        if !path.is_dir() {
            return Err(LintError::invalid(format!(
                "projectPath does not exist or is not a directory: {raw}"
            )));
        }
        return Ok(util::clean_path(path));
    }

    if let Some(file) = request.first_file() {
        return project::locate(Path::new(file), observer).map_err(|err| {
            LintError::invalid(format!("cannot infer the project root from files: {err}"))
        });
    }

    env::current_dir().map_err(|err| LintError::io("resolve current directory", err))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SYSTEM_FILENAME, SYSTEM_LINTER};
    use crate::observer::{RecordingObserver, SilentObserver};
    use serde_json::json;
    use tempfile::TempDir;
    use tracing::Level;

    struct PanickingObserver;

    impl Observer for PanickingObserver {
        fn observe(&self, _level: Level, _component: &'static str, _message: &str) {
            panic!("observer exploded");
        }
    }

    /// Quiet until asked to report a failure.
    struct PanicsOnError;

    impl Observer for PanicsOnError {
        fn observe(&self, level: Level, _component: &'static str, _message: &str) {
            if level == Level::ERROR {
                panic!("error sink exploded");
            }
        }
    }

    fn silent() -> Orchestrator {
        let config = Config {
            linter_program: "lint-mcp-no-such-linter".to_string(),
            ..Config::default()
        };
        Orchestrator::new(config, Arc::new(SilentObserver))
    }

    fn only_system_issue(result: &LintResult) -> &str {
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.from_linter, SYSTEM_LINTER);
        assert_eq!(issue.pos.filename, SYSTEM_FILENAME);
        &issue.text
    }

    #[test]
    fn missing_start_is_a_diagnostic() {
        let result = silent().handle_value(Some(&json!({ "files": ["  "] })));
        assert!(only_system_issue(&result).contains("projectPath"));
    }

    #[test]
    fn relative_project_path_is_rejected() {
        let result = silent().handle_value(Some(&json!({ "projectPath": "relative/dir" })));
        assert!(only_system_issue(&result).contains("absolute"));
    }

    #[test]
    fn project_path_must_be_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("main.go");
        std::fs::write(&file, "package main\n").unwrap();
        let result = silent().handle_value(Some(&json!({ "projectPath": file })));
        assert!(only_system_issue(&result).contains("not a directory"));
    }

    #[test]
    fn missing_linter_yields_install_hint() {
        let temp = TempDir::new().unwrap();
        let result = silent().handle_value(Some(&json!({ "projectPath": temp.path() })));
        assert!(only_system_issue(&result).contains("go install"));
    }

    #[test]
    fn malformed_arguments_are_a_diagnostic() {
        let result = silent().handle_value(Some(&json!({ "files": "not-a-list" })));
        assert!(only_system_issue(&result).starts_with("invalid request arguments"));
    }

    #[test]
    fn panic_becomes_single_diagnostic() {
        let orchestrator = Orchestrator::new(Config::default(), Arc::new(PanickingObserver));
        let request = LintRequest::default();
        let Ok(result) = orchestrator.handle(&request);
        assert!(only_system_issue(&result).contains("observer exploded"));
    }

    #[test]
    fn failures_are_reported_through_the_observer() {
        let observer = Arc::new(RecordingObserver::new());
        let orchestrator = Orchestrator::new(Config::default(), observer.clone());
        let result = orchestrator.handle_value(Some(&json!({ "projectPath": "relative/dir" })));
        only_system_issue(&result);
        let events = observer.events();
        let last = events.last().unwrap();
        assert_eq!(last.level, Level::ERROR);
        assert!(last.message.starts_with("request failed"));
    }

    #[test]
    fn panicking_observer_at_recovery_point_still_yields_payload() {
        let orchestrator = Orchestrator::new(Config::default(), Arc::new(PanicsOnError));
        let result = orchestrator.handle_value(Some(&json!({ "projectPath": "relative/dir" })));
        assert!(only_system_issue(&result).contains("absolute"));
    }

    #[test]
    fn base_dir_prefers_project_path() {
        let temp = TempDir::new().unwrap();
        let request = LintRequest {
            project_path: Some(temp.path().to_string_lossy().to_string()),
            files: vec!["/elsewhere/a.go".to_string()],
            ..LintRequest::default()
        };
        assert_eq!(resolve_base_dir(&request, &SilentObserver).unwrap(), temp.path());
    }

    #[test]
    fn base_dir_from_first_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("go.mod"), "module x\n").unwrap();
        let dir = temp.path().join("pkg");
        std::fs::create_dir_all(&dir).unwrap();
        let request = LintRequest {
            files: vec![String::new(), dir.join("a.go").to_string_lossy().to_string()],
            ..LintRequest::default()
        };
        assert_eq!(resolve_base_dir(&request, &SilentObserver).unwrap(), temp.path());
    }
}
