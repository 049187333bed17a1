pub mod secrets;
pub mod types;

pub use types::{AnalysisStamp, ProjectConfig};

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "miniploy.yaml";

/// Find `miniploy.yaml` in `start` or any of its parents.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Load configuration from an explicit path, or search upwards from the
/// working directory. A missing file yields an empty configuration.
pub fn load_config(path: Option<&Path>) -> Result<ProjectConfig> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(&std::env::current_dir()?),
    };

    let Some(config_path) = config_path.filter(|p| p.exists()) else {
        log::debug!("No {} found, using empty configuration", CONFIG_FILENAME);
        return Ok(ProjectConfig::default());
    };

    log::debug!("Loading configuration from {}", config_path.display());
    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::InvalidFile {
        path: config_path.clone(),
        reason: e.to_string(),
    })?;

    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }

    let config = serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
        path: config_path.clone(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

/// Where a save lands: the explicit path, else the file `load_config` would
/// find from `cwd`, else a new `miniploy.yaml` in `cwd`.
fn save_target(path: Option<&Path>, cwd: &Path) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => find_config_file(cwd).unwrap_or_else(|| cwd.join(CONFIG_FILENAME)),
    }
}

/// Save configuration back to the file it was loaded from. The file is
/// rewritten wholesale.
pub fn save_config(config: &ProjectConfig, path: Option<&Path>) -> Result<PathBuf> {
    let config_path = save_target(path, &std::env::current_dir()?);

    let content = serde_yaml::to_string(config)?;
    fs::write(&config_path, content).map_err(|e| ConfigError::SaveFailed {
        path: config_path.clone(),
        reason: e.to_string(),
    })?;

    log::info!("Saved configuration to {}", config_path.display());
    Ok(config_path)
}
