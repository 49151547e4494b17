//! Recovery of the analyzer's JSON payload from noisy process output.
//!
//! The analyzer interleaves log lines with its report, so the payload is searched for in
//! three passes, first hit wins:
//!
//! 1. the whole trimmed output, when it is a JSON object;
//! 2. any single line that is a JSON object on its own;
//! 3. the longest JSON object starting at any `{` in the output.
//!
//! Pass 3 runs an incremental `serde_json` parse from every candidate opening brace, which
//! is quadratic in the worst case. Tool output is bounded in practice and the pass only
//! looks at the first `max_scan_bytes` of it. Passes 1 and 2 are linear and always see the
//! whole output.

use crate::config::Config;
use serde_json::Value;

/// Extract with the configured scan bound.
pub fn extract(raw: &str) -> String {
    extract_bounded(raw, Config::get().max_scan_bytes)
}

/// The recovered payload, or an empty string when none parses.
pub fn extract_bounded(raw: &str, max_scan_bytes: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') && is_object(trimmed) {
        return trimmed.to_string();
    }

    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with('{') && line.ends_with('}') && is_object(line) {
            return line.to_string();
        }
    }

    longest_object(bounded(raw, max_scan_bytes))
        .map(str::to_string)
        .unwrap_or_default()
}

fn is_object(candidate: &str) -> bool {
    matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_)))
}

fn bounded(raw: &str, max_bytes: usize) -> &str {
    if raw.len() <= max_bytes {
        return raw;
    }
    let mut end = max_bytes;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

fn longest_object(raw: &str) -> Option<&str> {
    let mut best: Option<&str> = None;
    // Braces inside an accepted object are still tried: one inside a string literal can
    // open a longer object that runs past it.
    for (start, _) in raw.match_indices('{') {
        let rest = &raw[start..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        let Some(Ok(Value::Object(_))) = stream.next() else {
            continue;
        };
        let candidate = &rest[..stream.byte_offset()];
        if best.is_none_or(|current| candidate.len() > current.len()) {
            best = Some(candidate);
        }
    }
    best
}
