//! Project root resolution.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Files or directories whose presence marks a project root
pub const PROJECT_INDICATORS: &[&str] = &[
    "pyproject.toml", // Python
    "setup.py",       // Python (legacy)
    "Cargo.toml",     // Rust
    "package.json",   // JavaScript/Node
    "go.mod",         // Go
    ".git",           // Generic project indicator
    ".jj",            // Jujutsu VCS
];

/// Helper function to check if a path is a project root
pub fn is_project_root(path: &Path) -> bool {
    PROJECT_INDICATORS
        .iter()
        .any(|indicator| path.join(indicator).exists())
}

/// Walk up from `start` to the nearest project root
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|p| is_project_root(p))
        .map(Path::to_path_buf)
}

/// Resolve the root every operation runs against.
/// An explicit root must be an existing directory; otherwise the nearest project root
/// above the current directory is used. No root at all is fatal, so cleanup never runs
/// against an arbitrary directory.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let root = path
            .canonicalize()
            .with_context(|| format!("Cannot resolve project root {}", path.display()))?;
        if !root.is_dir() {
            bail!("Project root is not a directory: {}", root.display());
        }
        return Ok(root);
    }

    let cwd = env::current_dir().context("Cannot determine the current directory")?;
    let cwd = cwd.canonicalize().unwrap_or(cwd);
    match find_project_root(&cwd) {
        Some(root) => Ok(root),
        None => bail!(
            "No project root found above {}; pass --root",
            cwd.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_project_root_from_nested_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"docqa\"\n").unwrap();
        let nested = dir.path().join("app/services/qa");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_find_project_root_prefers_nearest() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let inner = dir.path().join("packages/api");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("pyproject.toml"), "").unwrap();

        assert_eq!(find_project_root(&inner.join("x")), Some(inner));
    }

    #[test]
    fn test_find_project_root_none_without_indicator() {
        let dir = tempdir().unwrap();
        let stray = dir.path().join("home/user");
        fs::create_dir_all(&stray).unwrap();

        assert_eq!(find_project_root(&stray), None);
    }

    #[test]
    fn test_resolve_explicit_root() {
        let dir = tempdir().unwrap();
        let root = resolve_root(Some(dir.path())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_root(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Cannot resolve project root"));
    }

    #[test]
    fn test_resolve_file_root_is_fatal() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("pyproject.toml");
        fs::write(&file, "").unwrap();

        let err = resolve_root(Some(&file)).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
