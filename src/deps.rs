//! Dependency-mode detection from the project's `.gitignore`.

use crate::model::DependencyMode;
use crate::observer::Observer;
use std::fs;
use std::path::Path;

pub const IGNORE_FILE: &str = ".gitignore";
pub const VENDOR_DIR: &str = "vendor";

const COMPONENT: &str = "deps";

/// Classify the project at `root`.
///
/// Only a whole-directory ignore rule for `vendor` (`vendor`, `vendor/`, `/vendor/`) means
/// dependencies come from the module cache. Anything else, including an unreadable ignore
/// file, means vendored.
pub fn detect_mode(root: &Path, observer: &dyn Observer) -> DependencyMode {
    let path = root.join(IGNORE_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            observer.info(
                COMPONENT,
                &format!("cannot read {}: {err}; assuming vendor mode", path.display()),
            );
            return DependencyMode::Vendored;
        }
    };

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if ignores_vendor_dir(line) {
            observer.info(
                COMPONENT,
                &format!("{} ignores the whole vendor directory ({line}); using module mode", path.display()),
            );
            return DependencyMode::Module;
        }
    }

    observer.info(
        COMPONENT,
        &format!("{} has no vendor directory rule; using vendor mode", path.display()),
    );
    DependencyMode::Vendored
}

fn ignores_vendor_dir(pattern: &str) -> bool {
    let pattern = pattern.strip_suffix('/').unwrap_or(pattern);
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
    pattern == VENDOR_DIR
}
