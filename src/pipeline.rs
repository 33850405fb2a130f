//! Pre-commit check pipeline: cleanup, lint, format, test, then a VCS status report.
//!
//! Phases run strictly in order and the first failure ends the run. There is no retry
//! and no rollback; whatever earlier phases changed stays changed.

use crate::cleanup::{self, CleanupOptions};
use crate::config::Config;
use crate::error::{status_code, PhaseError};
use crate::vcs::detect_vcs;

use anyhow::Result;
use colored::Colorize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Banner printed once every gate has passed
pub const SUCCESS_BANNER: &str = "All checks passed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cleanup,
    Lint,
    Format,
    Test,
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Cleanup => "cleanup",
            Phase::Lint => "lint",
            Phase::Format => "format",
            Phase::Test => "test",
            Phase::Report => "report",
        };
        f.write_str(name)
    }
}

/// Options controlling a check run
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    /// Delete secrets files when the built-in cleanup runs
    pub remove_secrets: bool,
    /// Print commands instead of running them; cleanup only reports
    pub dry_run: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            remove_secrets: true,
            dry_run: false,
        }
    }
}

/// How the cleanup phase is carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStrategy {
    /// Delegate to an executable script
    Hook(PathBuf),
    /// Run the built-in cleanup routine
    Builtin,
}

/// Pick the hook when it is a regular file with an executable bit, the built-in otherwise
pub fn select_cleanup(root: &Path, config: &Config) -> CleanupStrategy {
    match config.pipeline.cleanup_hook() {
        Some(hook) => {
            let path = root.join(hook);
            if is_executable(&path) {
                CleanupStrategy::Hook(path)
            } else {
                CleanupStrategy::Builtin
            }
        }
        None => CleanupStrategy::Builtin,
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

// Without an executable bit to inspect, shell hooks are never delegated to
#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Run the whole pipeline against `root`
pub fn run_check(root: &Path, config: &Config, options: CheckOptions) -> Result<()> {
    run_cleanup_phase(root, config, options)?;
    run_tool(Phase::Lint, root, &config.pipeline.lint, options.dry_run)?;
    run_tool(Phase::Format, root, &config.pipeline.format, options.dry_run)?;
    run_tool(Phase::Test, root, &config.pipeline.test, options.dry_run)?;
    report(root, options.dry_run)
}

fn run_cleanup_phase(root: &Path, config: &Config, options: CheckOptions) -> Result<()> {
    print_phase_header(Phase::Cleanup);

    match select_cleanup(root, config) {
        CleanupStrategy::Hook(hook) => {
            info!(hook = %hook.display(), "delegating cleanup to hook");
            run_tool(
                Phase::Cleanup,
                root,
                &[hook.to_string_lossy().into_owned()],
                options.dry_run,
            )
        }
        CleanupStrategy::Builtin => {
            info!(remove_secrets = options.remove_secrets, "running built-in cleanup");
            let cleanup_options = CleanupOptions {
                remove_secrets: options.remove_secrets,
                dry_run: options.dry_run,
            };
            let report = cleanup::run(root, config, cleanup_options)?;
            report.print_summary(options.dry_run);
            Ok(())
        }
    }
}

fn print_phase_header(phase: Phase) {
    println!("{}", format!("==> {}", phase).bold());
}

/// Run one external command in `root`, turning a non-zero exit into a PhaseError
fn run_tool(phase: Phase, root: &Path, argv: &[String], dry_run: bool) -> Result<()> {
    if phase != Phase::Cleanup {
        print_phase_header(phase);
    }

    let Some((program, args)) = argv.split_first() else {
        return Err(PhaseError::Spawn {
            phase,
            program: String::new(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into());
    };

    if dry_run {
        println!("Would run: {}", argv.join(" "));
        return Ok(());
    }

    let status = Command::new(program)
        .args(args)
        .current_dir(root)
        .status()
        .map_err(|source| PhaseError::Spawn {
            phase,
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(PhaseError::Failed {
            phase,
            code: status_code(status),
        }
        .into())
    }
}

fn report(root: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{}", "Dry run complete: no checks were executed.".yellow());
    } else {
        println!("{}", SUCCESS_BANNER.green().bold());
    }

    let (vcs, _) = detect_vcs(root);
    match vcs.status_command() {
        Some(argv) => run_tool(Phase::Report, root, &argv, dry_run),
        None => {
            warn!(root = %root.display(), "no version control detected, skipping status");
            println!("{}", "No version control detected; skipping status.".yellow());
            Ok(())
        }
    }
}
