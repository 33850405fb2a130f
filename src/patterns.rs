//! Cleanup target patterns and name matching.

use std::path::{Component, Path};

/// Filesystem type a target must have to be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Directory,
    File,
}

impl TargetKind {
    /// Check whether a `symlink_metadata` file type satisfies this target kind.
    /// Symlinks count as files so a link is removed without touching its target.
    pub fn accepts(self, file_type: std::fs::FileType) -> bool {
        match self {
            TargetKind::Directory => file_type.is_dir(),
            TargetKind::File => file_type.is_file() || file_type.is_symlink(),
        }
    }
}

/// A name pattern matched against every entry below the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePattern {
    pub pattern: String,
    pub kind: TargetKind,
}

impl TreePattern {
    pub fn new(pattern: impl Into<String>, kind: TargetKind) -> Self {
        TreePattern {
            pattern: pattern.into(),
            kind,
        }
    }

    /// Match the final path component against this pattern
    pub fn matches(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => matches_component(&name.to_string_lossy(), &self.pattern),
            None => false,
        }
    }
}

/// Build the tree pattern list from directory and file name lists
pub fn tree_patterns(directories: &[String], files: &[String]) -> Vec<TreePattern> {
    directories
        .iter()
        .map(|p| TreePattern::new(p.as_str(), TargetKind::Directory))
        .chain(files.iter().map(|p| TreePattern::new(p.as_str(), TargetKind::File)))
        .collect()
}

/// Find the first pattern matching both the name and the type of an entry
pub fn match_tree_pattern<'a>(
    path: &Path,
    file_type: std::fs::FileType,
    patterns: &'a [TreePattern],
) -> Option<&'a TreePattern> {
    patterns
        .iter()
        .find(|p| p.kind.accepts(file_type) && p.matches(path))
}

/// Match a single path component against a pattern with `*` wildcards
pub fn matches_component(component: &str, pattern: &str) -> bool {
    if pattern == component {
        return true;
    }

    if !pattern.contains('*') {
        return false;
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        if !suffix.contains('*') {
            // Suffix match like "*.pyc"
            return component.ends_with(suffix);
        }
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        if !prefix.contains('*') {
            // Prefix match like "coverage-*"
            return component.starts_with(prefix);
        }
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 2 {
        return component.len() >= parts[0].len() + parts[1].len()
            && component.starts_with(parts[0])
            && component.ends_with(parts[1]);
    }

    // Patterns with more than one inner wildcard are not supported
    false
}

/// A path that stays below the directory it is joined to: relative, no `..`
pub fn is_confined_relative(path: &Path) -> bool {
    let mut has_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // ============ matches_component tests ============

    #[test]
    fn test_exact_match() {
        assert!(matches_component("__pycache__", "__pycache__"));
        assert!(!matches_component("__pycache__x", "__pycache__"));
    }

    #[test]
    fn test_suffix_wildcard() {
        assert!(matches_component("module.cpython-311.pyc", "*.pyc"));
        assert!(matches_component(".pyc", "*.pyc"));
        assert!(!matches_component("module.py", "*.pyc"));
        assert!(!matches_component("pyc", "*.pyc"));
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(matches_component("coverage-3.xml", "coverage-*"));
        assert!(!matches_component("mycoverage-3.xml", "coverage-*"));
    }

    #[test]
    fn test_inner_wildcard() {
        assert!(matches_component("test_api.log", "test_*.log"));
        assert!(!matches_component("test_.lo", "test_*.log"));
        assert!(!matches_component("api.log", "test_*.log"));
    }

    #[test]
    fn test_multiple_inner_wildcards_unsupported() {
        assert!(!matches_component("a-b-c", "a*b*c"));
    }

    // ============ TreePattern tests ============

    #[test]
    fn test_tree_pattern_respects_kind() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("mod.pyc"), b"").unwrap();
        // A file that happens to be named like a directory target
        fs::write(dir.path().join("nested__pycache__"), b"").unwrap();

        let patterns = tree_patterns(&["__pycache__".to_string()], &["*.pyc".to_string()]);

        let cache = dir.path().join("__pycache__");
        let cache_type = fs::symlink_metadata(&cache).unwrap().file_type();
        assert_eq!(
            match_tree_pattern(&cache, cache_type, &patterns).map(|p| p.kind),
            Some(TargetKind::Directory)
        );

        let pyc = dir.path().join("mod.pyc");
        let pyc_type = fs::symlink_metadata(&pyc).unwrap().file_type();
        assert_eq!(
            match_tree_pattern(&pyc, pyc_type, &patterns).map(|p| p.kind),
            Some(TargetKind::File)
        );

        let other = dir.path().join("nested__pycache__");
        let other_type = fs::symlink_metadata(&other).unwrap().file_type();
        assert!(match_tree_pattern(&other, other_type, &patterns).is_none());
    }

    #[test]
    fn test_directory_named_like_file_pattern_is_not_matched() {
        let dir = tempdir().unwrap();
        let odd = dir.path().join("weird.pyc");
        fs::create_dir(&odd).unwrap();

        let patterns = tree_patterns(&[], &["*.pyc".to_string()]);
        let file_type = fs::symlink_metadata(&odd).unwrap().file_type();
        assert!(match_tree_pattern(&odd, file_type, &patterns).is_none());
    }

    // ============ is_confined_relative tests ============

    #[test]
    fn test_confined_relative_paths() {
        assert!(is_confined_relative(Path::new("data/uploads")));
        assert!(is_confined_relative(Path::new("./.env")));
        assert!(!is_confined_relative(Path::new("../data")));
        assert!(!is_confined_relative(Path::new("data/../../etc")));
        assert!(!is_confined_relative(Path::new("/tmp/data")));
        assert!(!is_confined_relative(Path::new("")));
        assert!(!is_confined_relative(Path::new(".")));
    }
}
