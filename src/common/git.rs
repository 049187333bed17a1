//! Reads the repository remote and branch straight from `.git`, so that
//! project setup works without a `git` binary on the PATH.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static GITHUB_REMOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com[:/](?P<org>[^/\s]+)/(?P<repo>[^/\s]+?)(?:\.git)?/?$")
        .expect("valid GitHub remote pattern")
});

/// URL of the first remote declared in `.git/config`.
pub fn remote_url(project: &Path) -> Option<String> {
    let content = fs::read_to_string(project.join(".git").join("config")).ok()?;

    let mut in_remote = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_remote = line.to_ascii_lowercase().starts_with("[remote ");
            continue;
        }
        if !in_remote {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "url" && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Branch that `.git/HEAD` points at, if HEAD is symbolic.
pub fn current_branch(project: &Path) -> Option<String> {
    let head = fs::read_to_string(project.join(".git").join("HEAD")).ok()?;
    head.trim()
        .strip_prefix("ref:")
        .map(str::trim)
        .and_then(|r| r.strip_prefix("refs/heads/"))
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

/// Splits a GitHub remote (https or ssh form) into `(org, repo)`.
pub fn github_slug(repo_url: &str) -> Option<(String, String)> {
    let caps = GITHUB_REMOTE.captures(repo_url.trim())?;
    Some((caps["org"].to_string(), caps["repo"].to_string()))
}
