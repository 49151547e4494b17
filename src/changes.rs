//! Change-set collection and the full-tree fallback scan.

use crate::base;
use crate::error::LintError;
use crate::git::Git;
use crate::model::ChangeScope;
use crate::observer::Observer;
use crate::project::{self, SOURCE_EXTENSION};
use crate::util;
use anyhow::Result;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const COMPONENT: &str = "changes";

#[derive(Debug, Serialize, Clone)]
pub struct ChangeSet {
    pub scope: ChangeScope,
    pub files: BTreeSet<PathBuf>,
}

/// Changed Go files under the git working directory of `git`.
///
/// Union of unstaged, staged and untracked files plus, when the resolver picked a
/// baseline, the `baseline..HEAD` diff. Paths are absolute and cleaned; entries that no
/// longer exist or are not Go files are dropped.
pub fn collect_changes(git: &Git, observer: &dyn Observer) -> Result<ChangeSet, LintError> {
    let scope = base::resolve_base(git, observer);
    observer.info(
        COMPONENT,
        &format!("change scope: {} (baseline {:?})", scope.label, scope.baseline),
    );

    let root = git.root();
    let mut files = BTreeSet::new();
    let mut add = |query: &str, listed: Result<Vec<String>>| match listed {
        Ok(lines) => {
            for line in lines {
                if let Some(path) = normalize_candidate(root, &line) {
                    files.insert(path);
                }
            }
        }
        Err(err) => observer.warn(COMPONENT, &format!("{query} failed: {err:#}")),
    };

    add("unstaged diff", git.diff_unstaged());
    add("staged diff", git.diff_staged());
    add("untracked listing", git.untracked());
    if !scope.is_working_tree_only() {
        add("commit range diff", git.diff_range(&scope.baseline, "HEAD"));
    }

    if files.is_empty() {
        return Err(LintError::NoChangesFound);
    }
    for file in &files {
        observer.debug(COMPONENT, &format!("changed file: {}", file.display()));
    }
    observer.info(COMPONENT, &format!("{} changed Go files", files.len()));
    Ok(ChangeSet { scope, files })
}

fn normalize_candidate(root: &Path, line: &str) -> Option<PathBuf> {
    let raw = Path::new(line);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };
    let clean = util::clean_path(&joined);
    if !project::is_source_file(&clean) || !clean.is_file() {
        return None;
    }
    Some(clean)
}

/// Every lintable Go file under `root`.
///
/// Skips `vendor` and hidden directories below the root, test files and generated files
/// (`.pb.go`, `.gen.go`). Ignore files are deliberately not honored.
pub fn scan_source_files(root: &Path, observer: &dyn Observer) -> Result<Vec<PathBuf>, LintError> {
    observer.info(COMPONENT, &format!("scanning {} for Go files", root.display()));

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            name != "vendor" && !name.starts_with('.')
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                return Err(LintError::io(
                    format!("scan {}", root.display()),
                    std::io::Error::other(err.to_string()),
                ));
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_lintable_name(&name) {
            continue;
        }
        let path = util::clean_path(entry.path());
        observer.debug(COMPONENT, &format!("found {}", path.display()));
        files.push(path);
    }

    if files.is_empty() {
        return Err(LintError::NoSourceFiles(root.to_path_buf()));
    }
    files.sort();
    observer.info(COMPONENT, &format!("scanned {} Go files", files.len()));
    Ok(files)
}

fn is_lintable_name(name: &str) -> bool {
    name.ends_with(&format!(".{SOURCE_EXTENSION}"))
        && !name.ends_with("_test.go")
        && !name.contains(".pb.go")
        && !name.contains(".gen.go")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::SilentObserver;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    #[test]
    fn lintable_names() {
        assert!(is_lintable_name("main.go"));
        assert!(!is_lintable_name("main_test.go"));
        assert!(!is_lintable_name("api.pb.go"));
        assert!(!is_lintable_name("models.gen.go"));
        assert!(!is_lintable_name("notes.md"));
    }

    #[test]
    fn normalize_candidate_drops_missing_and_foreign() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("a").join("a.go"));
        touch(&root.join("a").join("a.txt"));

        assert_eq!(
            normalize_candidate(root, "a/./a.go"),
            Some(root.join("a").join("a.go"))
        );
        assert_eq!(normalize_candidate(root, "a/a.txt"), None);
        assert_eq!(normalize_candidate(root, "a/gone.go"), None);
    }

    #[test]
    fn scan_skips_vendor_hidden_tests_and_generated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("main.go"));
        touch(&root.join("pkg").join("lib.go"));
        touch(&root.join("pkg").join("lib_test.go"));
        touch(&root.join("pkg").join("api.pb.go"));
        touch(&root.join("vendor").join("dep").join("dep.go"));
        touch(&root.join(".cache").join("c.go"));

        let files = scan_source_files(root, &SilentObserver).unwrap();
        assert_eq!(files, vec![root.join("main.go"), root.join("pkg").join("lib.go")]);
    }

    #[test]
    fn scan_of_hidden_root_still_walks_it() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".work");
        touch(&root.join("main.go"));
        let files = scan_source_files(&root, &SilentObserver).unwrap();
        assert_eq!(files, vec![root.join("main.go")]);
    }

    #[test]
    fn scan_without_go_files_fails() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("README.md"));
        let err = scan_source_files(temp.path(), &SilentObserver).unwrap_err();
        assert!(matches!(err, LintError::NoSourceFiles(_)));
    }
}
