//! API token storage.
//!
//! Tokens are read from the process environment. The `tokens` command
//! persists them in an untracked `.env` file in the working directory, which
//! `main` loads on startup.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_FILENAME: &str = ".env";

/// Token from the environment, ignoring blank values.
pub fn token_from_env(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Path of the `.env` file in `dir`, creating an empty file if needed.
pub fn ensure_env_file(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(ENV_FILENAME);
    if !path.exists() {
        fs::write(&path, "")?;
        log::debug!("Created {}", path.display());
    }
    Ok(path)
}

/// Parse a `.env` file into a key/value map. A missing file is empty.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    if !path.exists() {
        return Ok(values);
    }

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    for entry in entries {
        let (key, value) = entry.map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        values.insert(key, value);
    }
    Ok(values)
}

/// Set `key` in the `.env` file, replacing an existing assignment in place
/// and leaving every other line untouched.
pub fn set_env_key(path: &Path, key: &str, value: &str) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let assignment = format!("{}={}", key, quote_value(value));
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if !replaced && assigns_key(line, key) {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(assignment);
    }

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content)?;
    log::info!("Stored {} in {}", key, path.display());
    Ok(())
}

/// Show only enough of a token to recognise it.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 14 {
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

fn assigns_key(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed).trim_start();
    trimmed
        .strip_prefix(key)
        .map(|rest| rest.trim_start().starts_with('='))
        .unwrap_or(false)
}

fn quote_value(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("'{}'", value)
    }
}
