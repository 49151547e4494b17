//! Project location and multi-project partitioning.

use crate::error::LintError;
use crate::model::ProjectGroup;
use crate::observer::Observer;
use crate::util;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const MODULE_MARKER: &str = "go.mod";
pub const SOURCE_EXTENSION: &str = "go";

const COMPONENT: &str = "project";

/// Find the module root enclosing `path`.
///
/// Walks upward from the path (or its directory when it is a file) looking for `go.mod`.
/// Without a marker the starting directory itself is returned, so isolated files still get
/// a scope.
pub fn locate(path: &Path, observer: &dyn Observer) -> Result<PathBuf, LintError> {
    if !path.is_absolute() {
        return Err(LintError::invalid(format!(
            "path must be absolute: {}",
            path.display()
        )));
    }
    let start = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
    };

    let mut dir = start.as_path();
    loop {
        if dir.join(MODULE_MARKER).is_file() {
            observer.debug(COMPONENT, &format!("module root for {}: {}", path.display(), dir.display()));
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    observer.debug(
        COMPONENT,
        &format!("no {MODULE_MARKER} above {}, using {}", path.display(), start.display()),
    );
    Ok(start)
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}

/// Package identifier of `dir` relative to `root`: `.` for the root, `./a/b` below it.
pub fn package_id(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let rel = util::normalize_path(rel);
    if rel == "." {
        Some(rel)
    } else {
        Some(format!("./{rel}"))
    }
}

/// Group `files` by owning project root.
///
/// Paths are cleaned lexically first, so `x/../a.go` and `a.go` land in the same group.
/// Relative paths are rejected; missing or non-Go files are skipped with a warning. Groups
/// keep the order in which their roots were first seen; files and packages are
/// deduplicated within each group.
pub fn partition<P: AsRef<Path>>(
    files: &[P],
    observer: &dyn Observer,
) -> Result<Vec<ProjectGroup>, LintError> {
    let mut groups: Vec<ProjectGroup> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    let mut seen_files: HashSet<PathBuf> = HashSet::new();

    for file in files {
        let file = file.as_ref();
        if file.as_os_str().is_empty() {
            continue;
        }
        if !file.is_absolute() {
            return Err(LintError::invalid(format!(
                "file path must be absolute: {}",
                file.display()
            )));
        }
        let cleaned = util::clean_path(file);
        let file = cleaned.as_path();
        if !file.exists() {
            observer.warn(COMPONENT, &format!("file {} does not exist, skipping", file.display()));
            continue;
        }
        if !is_source_file(file) {
            observer.warn(COMPONENT, &format!("file {} is not a Go file, skipping", file.display()));
            continue;
        }

        let root = locate(file, observer)?;
        let Some(dir) = file.parent() else {
            continue;
        };
        let Some(package) = package_id(&root, dir) else {
            observer.warn(
                COMPONENT,
                &format!("cannot place {} under {}, skipping", dir.display(), root.display()),
            );
            continue;
        };

        let slot = *index.entry(root.clone()).or_insert_with(|| {
            groups.push(ProjectGroup::new(root.clone()));
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if seen_files.insert(file.to_path_buf()) {
            group.files.push(file.to_path_buf());
        }
        if !group.packages.contains(&package) {
            observer.debug(
                COMPONENT,
                &format!("package {package} (project {}, file {})", root.display(), file.display()),
            );
            group.packages.push(package);
        }
    }

    if groups.is_empty() {
        return Err(LintError::NoValidPackages);
    }
    Ok(groups)
}
