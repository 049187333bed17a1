use crate::common::file_utils::to_forward_slashes;
use crate::error::MiniployError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Files whose content tells the model what kind of project this is.
pub const MARKER_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "Dockerfile",
    "docker-compose.yml",
    "next.config.js",
    "next.config.mjs",
    "vite.config.js",
    "vite.config.ts",
    "nuxt.config.js",
    "nuxt.config.ts",
    "angular.json",
    "vue.config.js",
    "gatsby-config.js",
    "app.py",
    "main.py",
    "manage.py",
    "wsgi.py",
    "asgi.py",
    "index.html",
    "index.js",
    "index.ts",
    "server.js",
    "app.js",
    "go.mod",
    "Gemfile",
    "composer.json",
    "Cargo.toml",
];

/// Dependency, virtualenv and build output directories.
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    "venv",
    ".venv",
    "env",
    "dist",
    "build",
    ".next",
    "out",
];

/// Deepest directory level (root = 0) whose files are considered.
pub const MAX_DIR_DEPTH: usize = 2;

/// Longer files are cut to this many characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Relative path (with `/` separators) to file content.
pub type MarkerFiles = BTreeMap<String, String>;

/// Collect the marker files of a project, at most [`MAX_DIR_DEPTH`]
/// directories deep.
pub fn scan_marker_files(root: &Path) -> Result<MarkerFiles, MiniployError> {
    let mut found = MarkerFiles::new();

    // A file inside a directory at depth N sits at walkdir depth N + 1.
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_DIR_DEPTH + 1)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_marker(&entry) {
            continue;
        }

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .map(to_forward_slashes)
            .unwrap_or_else(|_| entry.file_name().to_string_lossy().to_string());

        found.insert(relative, truncate_content(&String::from_utf8_lossy(&bytes)));
    }

    log::debug!("Found {} marker files under {}", found.len(), root.display());
    Ok(found)
}

/// True when the only markers present are `index.html` files.
pub fn is_plain_html(found: &MarkerFiles) -> bool {
    !found.is_empty() && found.keys().all(|p| file_name(p) == "index.html")
}

/// True when a Dockerfile was among the markers.
pub fn has_dockerfile(found: &MarkerFiles) -> bool {
    found.keys().any(|p| file_name(p) == "Dockerfile")
}

fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIPPED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref())
}

fn is_marker(entry: &DirEntry) -> bool {
    MARKER_FILES.contains(&entry.file_name().to_string_lossy().as_ref())
}

fn file_name(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collects_markers_with_relative_keys() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "package.json", r#"{"name":"web"}"#);
        write(root, "api/requirements.txt", "flask\n");
        write(root, "README.md", "# not a marker");

        let found = scan_marker_files(root).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["package.json"], r#"{"name":"web"}"#);
        assert_eq!(found["api/requirements.txt"], "flask\n");
    }

    #[test]
    fn test_respects_depth_limit() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a/b/go.mod", "module x");
        write(root, "a/b/c/Cargo.toml", "[package]");

        let found = scan_marker_files(root).unwrap();
        assert!(found.contains_key("a/b/go.mod"));
        assert!(!found.contains_key("a/b/c/Cargo.toml"));
    }

    #[test]
    fn test_skips_dependency_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "node_modules/react/package.json", "{}");
        write(root, "venv/main.py", "");
        write(root, "dist/index.html", "");
        write(root, "app.py", "print('hi')");

        let found = scan_marker_files(root).unwrap();
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["app.py"]);
    }

    #[test]
    fn test_truncates_large_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "package.json", &"x".repeat(MAX_CONTENT_CHARS + 10));

        let content = &scan_marker_files(root).unwrap()["package.json"];
        assert!(content.ends_with("... (truncated)"));
        assert_eq!(
            content.chars().count(),
            MAX_CONTENT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_small_files_are_untouched() {
        assert_eq!(truncate_content("hello"), "hello");
        let exact = "é".repeat(MAX_CONTENT_CHARS);
        assert_eq!(truncate_content(&exact), exact);
    }

    #[test]
    fn test_plain_html_and_dockerfile_checks() {
        let mut found = MarkerFiles::new();
        assert!(!is_plain_html(&found));

        found.insert("index.html".to_string(), String::new());
        found.insert("docs/index.html".to_string(), String::new());
        assert!(is_plain_html(&found));
        assert!(!has_dockerfile(&found));

        found.insert("Dockerfile".to_string(), "FROM nginx".to_string());
        assert!(!is_plain_html(&found));
        assert!(has_dockerfile(&found));
    }
}
