//! VCS detection for Git and Jujutsu.

use std::path::{Path, PathBuf};

/// VCS internal directories that should never be traversed or removed.
pub const VCS_INTERNALS: &[&str] = &[
    ".git", ".jj", ".svn", ".hg", ".bzr", "_darcs", ".pijul", "CVS", ".fossil",
];

/// VCS type detected in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsType {
    Git,
    Jujutsu,
    None,
}

impl VcsType {
    /// Command printing the working-tree status, if a VCS is in use
    pub fn status_command(self) -> Option<Vec<String>> {
        let argv: &[&str] = match self {
            VcsType::Git => &["git", "status"],
            VcsType::Jujutsu => &["jj", "status"],
            VcsType::None => return None,
        };
        Some(argv.iter().map(|s| s.to_string()).collect())
    }
}

/// Detect which VCS is in use for a given path by walking up to find .jj or .git
/// Prefers Jujutsu if both .jj and .git exist (colocated repositories)
pub fn detect_vcs(path: &Path) -> (VcsType, Option<PathBuf>) {
    for ancestor in path.ancestors() {
        if ancestor.join(".jj").exists() {
            return (VcsType::Jujutsu, Some(ancestor.to_path_buf()));
        }
        if ancestor.join(".git").exists() {
            return (VcsType::Git, Some(ancestor.to_path_buf()));
        }
    }
    (VcsType::None, None)
}

/// Check whether a path component names a VCS internal directory
pub fn is_vcs_internal(name: &str) -> bool {
    VCS_INTERNALS.contains(&name)
}
