#![cfg(unix)]

use lint_mcp::config::Config;
use lint_mcp::model::{ANALYZER_LINTER, LintResult, SYSTEM_FILENAME, SYSTEM_LINTER, UNKNOWN_FILENAME};
use lint_mcp::observer::RecordingObserver;
use lint_mcp::orchestrator::Orchestrator;
use serde_json::{Value, json};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reports one issue per target, using the target as the issue text.
const ECHO_TARGETS: &str = r#"issues=""
skip=0
for a in "$@"; do
  if [ "$skip" = 1 ]; then skip=0; continue; fi
  case "$a" in
    --new-from-rev) skip=1 ;;
    run|json|--*) ;;
    *) issues="$issues${issues:+,}{\"FromLinter\":\"fake\",\"Text\":\"$a\",\"Pos\":{\"Filename\":\"$a\",\"Line\":1}}" ;;
  esac
done
echo 'level=info msg="[loader] loading packages"'
printf '{"Issues":[%s],"Report":{}}\n' "$issues"
exit 1"#;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn copy_dir(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).unwrap();
    for entry in std::fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&path, &target);
        } else {
            std::fs::copy(&path, &target).unwrap();
        }
    }
}

struct Harness {
    temp: TempDir,
    log: PathBuf,
    observer: Arc<RecordingObserver>,
    orchestrator: Orchestrator,
}

impl Harness {
    fn new(body: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let log = bin.join("calls.log");
        let program = bin.join("golangci-lint");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\nif [ \"$1\" = \"--version\" ]; then exit 0; fi\n{body}\n",
            log.display()
        );
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = Config {
            linter_program: program.to_string_lossy().to_string(),
            ..Config::default()
        };
        let observer = Arc::new(RecordingObserver::new());
        let orchestrator = Orchestrator::new(config, observer.clone());
        Self {
            temp,
            log,
            observer,
            orchestrator,
        }
    }

    fn workspace(&self, name: &str) -> PathBuf {
        let dir = self.temp.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn run(&self, arguments: Value) -> LintResult {
        self.orchestrator.handle_value(Some(&arguments))
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .filter(|line| *line != "--version")
            .map(str::to_string)
            .collect()
    }

    fn probed(&self) -> bool {
        self.log.exists()
    }
}

fn texts(result: &LintResult) -> Vec<&str> {
    result.issues.iter().map(|issue| issue.text.as_str()).collect()
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn git(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.email=dev@example.com", "-c", "user.name=Dev", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(root)
        .output()
        .unwrap()
        .status;
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn missing_start_returns_guidance_without_running_tools() {
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);

    let result = harness.run(json!({ "checkOnlyChanges": true, "files": [] }));
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].from_linter, SYSTEM_LINTER);
    assert_eq!(result.issues[0].pos.filename, SYSTEM_FILENAME);
    assert!(result.issues[0].text.contains("projectPath"));
    assert!(!harness.probed());
}

#[test]
fn full_scan_lints_all_packages_of_a_project_in_one_call() {
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);
    let repo = harness.workspace("repo");
    copy_dir(&fixture_path("go_multi"), &repo);

    let result = harness.run(json!({
        "projectPath": repo,
        "checkOnlyChanges": false,
        "files": [repo.join("a").join("a.go"), repo.join("b").join("b.go")],
    }));

    assert_eq!(texts(&result), vec!["./a", "./b"]);
    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    // The fixture ignores vendor/, so dependencies come from the module cache.
    assert_eq!(
        calls[0],
        "run --out-format json --print-issued-lines=false --print-linter-name=true ./a ./b"
    );
}

#[test]
fn full_scan_spans_projects_and_forwards_new_from_rev() {
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);
    let one = harness.workspace("one");
    copy_dir(&fixture_path("go_multi"), &one);
    let two = harness.workspace("two");
    std::fs::write(two.join("go.mod"), "module example.com/two\n").unwrap();
    std::fs::write(two.join("main.go"), "package main\n").unwrap();

    let result = harness.run(json!({
        "checkOnlyChanges": false,
        "newFromRev": "HEAD~1",
        "files": [one.join("b").join("b.go"), two.join("main.go")],
    }));

    assert_eq!(texts(&result), vec!["./b", "."]);
    let calls = harness.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ends_with("--new-from-rev HEAD~1 ./b"));
    // No .gitignore in the second project: vendored.
    assert!(calls[1].starts_with("run --modules-download-mode=vendor"));
    assert!(calls[1].ends_with("--new-from-rev HEAD~1 ."));
}

#[test]
fn full_scan_reports_analyzer_failures_in_band() {
    let _guard = serial();
    let harness = Harness::new("exit 2");
    let repo = harness.workspace("repo");
    copy_dir(&fixture_path("go_multi"), &repo);

    let result = harness.run(json!({
        "checkOnlyChanges": false,
        "files": [repo.join("a").join("a.go")],
    }));
    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.from_linter, ANALYZER_LINTER);
    assert_eq!(issue.pos.filename, UNKNOWN_FILENAME);
    assert!(issue.text.contains("exit status 2"));
}

#[test]
fn full_scan_quotes_unparseable_output() {
    let _guard = serial();
    let harness = Harness::new("echo 'panic: runtime error: invalid memory address'\nexit 1");
    let repo = harness.workspace("repo");
    copy_dir(&fixture_path("go_multi"), &repo);

    let result = harness.run(json!({
        "checkOnlyChanges": false,
        "files": [repo.join("a").join("a.go")],
    }));
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].from_linter, ANALYZER_LINTER);
    assert!(result.issues[0].text.contains("panic: runtime error"));
}

#[test]
fn change_only_lints_just_the_modified_file() {
    if !git_available() {
        return;
    }
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);
    let repo = harness.workspace("repo");
    copy_dir(&fixture_path("go_multi"), &repo);
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-q", "-m", "initial"]);
    git(&repo, &["update-ref", "refs/remotes/origin/main", "HEAD"]);

    let target = repo.join("a").join("a.go");
    std::fs::write(&target, "package a\n\nfunc Changed() {}\n").unwrap();

    let result = harness.run(json!({ "projectPath": repo, "checkOnlyChanges": true }));

    let expected = target.to_string_lossy().to_string();
    assert_eq!(texts(&result), vec![expected.as_str()]);
    let calls = harness.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("run --out-format json --print-issued-lines=false"));
    assert!(harness.observer.contains("working tree changes"));
}

#[test]
fn change_only_outside_git_scans_the_tree() {
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);
    let dir = harness.workspace("plain");
    std::fs::write(dir.join("go.mod"), "module example.com/plain\n").unwrap();
    std::fs::write(dir.join("main.go"), "package main\n").unwrap();
    std::fs::write(dir.join("main_test.go"), "package main\n").unwrap();

    let result = harness.run(json!({ "projectPath": dir }));

    let expected = dir.join("main.go").to_string_lossy().to_string();
    assert_eq!(texts(&result), vec![expected.as_str()]);
    assert!(harness.observer.contains("scanning the whole tree"));
}

#[test]
fn change_only_with_nothing_to_lint_explains_both_failures() {
    let _guard = serial();
    let harness = Harness::new(ECHO_TARGETS);
    let dir = harness.workspace("empty");

    let result = harness.run(json!({ "projectPath": dir }));
    assert_eq!(result.issues.len(), 1);
    let text = &result.issues[0].text;
    assert_eq!(result.issues[0].from_linter, SYSTEM_LINTER);
    assert!(text.contains("change detection failed"));
    assert!(text.contains("fallback file scan also failed"));
    assert!(harness.calls().is_empty());
}
