use crate::error::MiniployError;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never uploaded as part of a static site.
const STATIC_IGNORED_DIRS: &[&str] = &["node_modules"];

/// A file selected for upload, with its path relative to the site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub absolute: PathBuf,
    /// Forward-slash separated path relative to the site root.
    pub relative: String,
}

/// Validates a project path and resolves it to an absolute directory
pub fn validate_project_path(path: &Path) -> Result<PathBuf, MiniployError> {
    let canonical = match path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            if path.exists() {
                path.to_path_buf()
            } else {
                return Err(MiniployError::User(format!(
                    "Path not found: {} ({})",
                    path.display(),
                    e
                )));
            }
        }
    };

    if !canonical.is_dir() {
        return Err(MiniployError::User(format!(
            "Path must be a directory: {}",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Collects every file of a static site, skipping hidden entries and
/// dependency directories. Results are sorted by relative path.
pub fn collect_site_files(root: &Path) -> Result<Vec<SiteFile>, MiniployError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored(e, root))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map(to_forward_slashes)
            .unwrap_or_else(|_| entry.file_name().to_string_lossy().to_string());

        files.push(SiteFile {
            absolute: entry.path().to_path_buf(),
            relative,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    log::debug!("Collected {} site files under {}", files.len(), root.display());
    Ok(files)
}

/// Checks if a directory entry should be left out of an upload
fn is_ignored(entry: &DirEntry, root: &Path) -> bool {
    let relative_path = match entry.path().strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return false,
    };

    // The root itself may live under a dot-directory (e.g. a temp dir).
    if relative_path.as_os_str().is_empty() {
        return false;
    }

    if entry.file_name().to_string_lossy().starts_with('.') {
        return true;
    }

    relative_path.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .map(|n| STATIC_IGNORED_DIRS.contains(&n))
            .unwrap_or(false),
        _ => false,
    })
}

/// Renders a relative path with `/` separators on every platform.
pub fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_project_path_rejects_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("index.html");
        fs::write(&file, "<html></html>").unwrap();

        assert!(validate_project_path(temp_dir.path()).is_ok());
        let err = validate_project_path(&file).unwrap_err();
        assert!(err.to_string().contains("must be a directory"));
        let err = validate_project_path(&temp_dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("Path not found"));
    }

    #[test]
    fn test_collect_site_files_skips_hidden_and_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), "[core]").unwrap();
        fs::write(root.join("index.html"), "<html></html>").unwrap();
        fs::write(root.join("css/site.css"), "body {}").unwrap();
        fs::write(root.join(".env"), "SECRET=1").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "").unwrap();

        let files = collect_site_files(root).unwrap();
        let relative: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["css/site.css", "index.html"]);
    }
}
