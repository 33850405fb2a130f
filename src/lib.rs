//! repokeep - Workspace cleanup and pre-commit checks
//!
//! Two entry points share one cleanup routine:
//! - `clean` removes bytecode, tool caches, coverage output and OS junk, then resets the
//!   runtime data directories so each holds only its marker file.
//! - `check` runs cleanup (or an executable cleanup hook), then lint, format and test,
//!   stopping at the first failure, and finally prints the VCS working-tree status.
//!
//! Every operation takes the project root explicitly; the process working directory is
//! never changed.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod project;
pub mod vcs;

// Re-export commonly used items
pub use cleanup::{CleanupOptions, CleanupReport};
pub use config::{Config, CONFIG_FILE_NAME};
pub use error::PhaseError;
pub use patterns::{matches_component, TargetKind, TreePattern};
pub use pipeline::{run_check, select_cleanup, CheckOptions, CleanupStrategy, Phase, SUCCESS_BANNER};
pub use project::{find_project_root, resolve_root};
pub use vcs::{detect_vcs, VcsType};
