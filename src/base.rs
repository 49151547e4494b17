//! Base-commit resolution.
//!
//! Picks the baseline that "what changed" is measured against when the caller gave no
//! explicit range. Strategies, first applicable wins:
//!
//! 1. Unpushed commits: `origin/<branch>`, `upstream/<branch>` or `remote/<branch>` with
//!    commits on HEAD that the remote ref lacks.
//! 2. Divergence from the primary branch: merge base of HEAD and the primary branch, when
//!    HEAD is ahead of it.
//! 3. Working tree changes: the empty "working tree only" baseline.
//! 4. Recent history: the first of `HEAD~2` .. `HEAD~5` that exists.
//! 5. `HEAD~1`, or the working tree baseline for a repository with a single commit.
//!
//! A failing git query only disqualifies its own strategy.

use crate::git::{self, Git};
use crate::model::ChangeScope;
use crate::observer::Observer;

const COMPONENT: &str = "base";

const REMOTES: &[&str] = &["origin", "upstream", "remote"];

const PRIMARY_CANDIDATES: &[&str] = &[
    "origin/main",
    "main",
    "origin/master",
    "master",
    "origin/develop",
    "develop",
];

const REFLOG_DEPTH: usize = 15;

pub fn resolve_base(git: &Git, observer: &dyn Observer) -> ChangeScope {
    observer.info(
        COMPONENT,
        &format!("resolving base commit for {}", git.root().display()),
    );

    let branch = match git.current_branch() {
        Ok(branch) => Some(branch),
        Err(err) => {
            observer.warn(COMPONENT, &format!("current branch unavailable: {err:#}"));
            None
        }
    };

    if let Some(scope) = branch
        .as_deref()
        .and_then(|branch| unpushed_commits(git, branch, observer))
    {
        return scope;
    }

    if let Some(scope) = divergence(git, branch.as_deref(), observer) {
        return scope;
    }

    match git.status_porcelain() {
        Ok(status) if !status.trim().is_empty() => {
            return ChangeScope::working_tree("working tree changes");
        }
        Ok(_) => {}
        Err(err) => observer.warn(COMPONENT, &format!("git status failed: {err:#}")),
    }

    for depth in 2..=5 {
        let candidate = format!("HEAD~{depth}");
        if git.ref_exists(&candidate) {
            return ChangeScope::new(candidate, format!("last {depth} commits"));
        }
    }

    if git.ref_exists("HEAD~1") {
        return ChangeScope::new("HEAD~1", "last commit");
    }
    observer.warn(
        COMPONENT,
        "HEAD~1 does not exist; limiting the scope to the working tree",
    );
    ChangeScope::working_tree("working tree only (no prior commit)")
}

fn unpushed_commits(git: &Git, branch: &str, observer: &dyn Observer) -> Option<ChangeScope> {
    if branch.is_empty() || branch == "HEAD" {
        observer.debug(COMPONENT, "detached HEAD, skipping unpushed-commit detection");
        return None;
    }
    for remote in REMOTES {
        let candidate = format!("{remote}/{branch}");
        if !git.ref_exists(&candidate) {
            continue;
        }
        match git.rev_count(&format!("{candidate}..HEAD")) {
            Ok(0) => {}
            Ok(count) => {
                observer.info(COMPONENT, &format!("{count} unpushed commits vs {candidate}"));
                return Some(ChangeScope::new(
                    candidate,
                    format!("unpushed commits ({count})"),
                ));
            }
            Err(err) => observer.warn(COMPONENT, &format!("counting {candidate}..HEAD failed: {err:#}")),
        }
    }
    None
}

fn divergence(git: &Git, branch: Option<&str>, observer: &dyn Observer) -> Option<ChangeScope> {
    let Some(primary) = primary_branch(git, branch, observer) else {
        observer.info(COMPONENT, "no primary branch found, skipping divergence detection");
        return None;
    };
    let merge_base = match git.merge_base("HEAD", &primary) {
        Ok(sha) => sha,
        Err(err) => {
            observer.warn(COMPONENT, &format!("merge-base with {primary} failed: {err:#}"));
            return None;
        }
    };
    match git.rev_count(&format!("{merge_base}..HEAD")) {
        Ok(0) => None,
        Ok(count) => {
            observer.info(
                COMPONENT,
                &format!("diverged from {primary} at {merge_base} ({count} commits)"),
            );
            Some(ChangeScope::new(
                merge_base,
                format!("divergence point (vs {primary}, {count} commits)"),
            ))
        }
        Err(err) => {
            observer.warn(COMPONENT, &format!("counting {merge_base}..HEAD failed: {err:#}"));
            None
        }
    }
}

/// The branch this repository treats as its main line.
///
/// Tries the remote's recorded default branch, then the reflog entry that checked out the
/// current branch, then a fixed candidate list. Remote refs win over local ones.
pub fn primary_branch(git: &Git, branch: Option<&str>, observer: &dyn Observer) -> Option<String> {
    match git.remote_default_ref() {
        Ok(reference) => {
            if let Some(name) = reference
                .strip_prefix("refs/remotes/origin/")
                .filter(|name| !name.is_empty())
            {
                if let Some(found) = existing(git, name) {
                    observer.info(COMPONENT, &format!("remote default branch: {found}"));
                    return Some(found);
                }
            }
        }
        Err(err) => observer.debug(COMPONENT, &format!("no remote default branch: {err:#}")),
    }

    if let Some(branch) = branch.filter(|branch| !branch.is_empty() && *branch != "HEAD") {
        match git.reflog(REFLOG_DEPTH) {
            Ok(lines) => {
                for line in &lines {
                    let Some(source) = git::checkout_source(line, branch) else {
                        continue;
                    };
                    if let Some(found) = existing(git, source) {
                        observer.info(COMPONENT, &format!("reflog source branch: {found}"));
                        return Some(found);
                    }
                }
            }
            Err(err) => observer.debug(COMPONENT, &format!("reflog unavailable: {err:#}")),
        }
    }

    let found = PRIMARY_CANDIDATES
        .iter()
        .find(|candidate| git.ref_exists(candidate))
        .map(|candidate| candidate.to_string());
    if let Some(found) = &found {
        observer.info(COMPONENT, &format!("primary branch candidate: {found}"));
    }
    found
}

fn existing(git: &Git, name: &str) -> Option<String> {
    let remote = format!("origin/{name}");
    if git.ref_exists(&remote) {
        return Some(remote);
    }
    if git.ref_exists(name) {
        return Some(name.to_string());
    }
    None
}
