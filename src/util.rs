use std::path::{Component, Path, PathBuf};

/// Render `path` with forward slashes, dropping `.` components; empty becomes `.`.
pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Lexically clean `path`: drop `.` components and fold `..` into its parent.
///
/// Does not touch the filesystem, so symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// `path` relative to `root`, unless that would need `..` to get there.
pub fn relative_within(root: &Path, path: &Path) -> Option<String> {
    let rel = clean_path(path);
    let rel = rel.strip_prefix(clean_path(root)).ok()?;
    let rendered = normalize_path(rel);
    if rendered == ".." || rendered.starts_with("../") {
        return None;
    }
    Some(rendered)
}

pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
