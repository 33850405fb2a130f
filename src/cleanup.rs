//! Workspace cleanup: caches, bytecode, coverage output, runtime data directories.
//!
//! Every removal is best-effort. Failures are logged at debug level and counted in the
//! report but never stop the run. The only fatal step is recreating a runtime directory
//! or its marker file, since callers rely on those existing afterwards.

use crate::config::Config;
use crate::patterns::{match_tree_pattern, TargetKind, TreePattern};
use crate::vcs::is_vcs_internal;

use anyhow::{Context, Result};
use colored::Colorize;
use humansize::{format_size, BINARY};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options controlling a cleanup run
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    /// Also delete the configured secrets files (e.g. `.env`)
    pub remove_secrets: bool,
    /// Report what would be removed without touching the filesystem
    pub dry_run: bool,
}

/// Outcome of a cleanup run
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Paths removed (or that would be removed in a dry run)
    pub removed: Vec<PathBuf>,
    /// Runtime directories reset to contain only their marker
    pub reset_dirs: Vec<PathBuf>,
    pub bytes_freed: u64,
    /// Removals that failed and were ignored
    pub suppressed: usize,
}

impl CleanupReport {
    pub fn print_summary(&self, dry_run: bool) {
        println!("========================================");
        if dry_run {
            println!(
                "Would remove {} paths ({})",
                self.removed.len(),
                format_size(self.bytes_freed, BINARY).bold()
            );
            println!("Dry run mode: No files were deleted.");
            return;
        }

        println!(
            "Removed {} paths, freed {}",
            self.removed.len(),
            format_size(self.bytes_freed, BINARY).bold()
        );
        if self.suppressed > 0 {
            println!(
                "{}",
                format!("{} paths could not be removed (ignored)", self.suppressed).yellow()
            );
        }
    }
}

/// Bring the workspace under `root` to a clean state.
/// Safe to run repeatedly: a second run on a clean tree changes nothing.
pub fn run(root: &Path, config: &Config, options: CleanupOptions) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    println!("{}", "Removing bytecode caches and OS junk files...".bold());
    let skip_dirs: HashSet<PathBuf> = config
        .root
        .directories
        .iter()
        .map(|d| root.join(d))
        .collect();
    remove_tree_artifacts(
        root,
        &config.tree_patterns(),
        &skip_dirs,
        options,
        &mut report,
    );

    println!("{}", "Removing tool caches and coverage reports...".bold());
    for dir in &config.root.directories {
        remove_root_target(&root.join(dir), TargetKind::Directory, options, &mut report);
    }
    for file in &config.root.files {
        remove_root_target(&root.join(file), TargetKind::File, options, &mut report);
    }

    if options.remove_secrets {
        println!("{}", "Removing local secrets files...".bold());
        for file in &config.secrets.files {
            remove_root_target(&root.join(file), TargetKind::File, options, &mut report);
        }
    }

    println!("{}", "Resetting runtime data directories...".bold());
    for dir in &config.runtime.directories {
        reset_runtime_dir(&root.join(dir), &config.runtime.marker, options, &mut report)?;
    }

    Ok(report)
}

/// Walk the tree and remove every entry matching a tree pattern.
/// Matches are collected first so the walk never reads a directory it already deleted.
fn remove_tree_artifacts(
    root: &Path,
    patterns: &[TreePattern],
    skip_dirs: &HashSet<PathBuf>,
    options: CleanupOptions,
    report: &mut CleanupReport,
) {
    if patterns.is_empty() {
        return;
    }

    let skip = skip_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        // Our own patterns decide what goes; ignore files must not hide caches from us
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let path = entry.path();

            // Never traverse VCS internals
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if is_vcs_internal(name) {
                    return false;
                }
            }

            // Root-level cache directories are removed wholesale later
            !skip.contains(path)
        })
        .build();

    let mut matched: Vec<(PathBuf, TargetKind)> = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        if path == root {
            continue;
        }

        // Skip anything inside a directory we already matched
        if matched
            .iter()
            .any(|(dir, kind)| *kind == TargetKind::Directory && path.starts_with(dir))
        {
            continue;
        }

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if let Some(pattern) = match_tree_pattern(path, file_type, patterns) {
            matched.push((path.to_path_buf(), pattern.kind));
        }
    }

    for (path, kind) in matched {
        remove_entry(&path, kind, options, report);
    }
}

/// Remove one root-relative target if it exists with the expected type
fn remove_root_target(
    path: &Path,
    kind: TargetKind,
    options: CleanupOptions,
    report: &mut CleanupReport,
) {
    let metadata = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cannot stat cleanup target");
            report.suppressed += 1;
            return;
        }
    };

    if !kind.accepts(metadata.file_type()) {
        debug!(path = %path.display(), expected = ?kind, "type mismatch, leaving in place");
        return;
    }

    remove_entry(path, kind, options, report);
}

fn remove_entry(path: &Path, kind: TargetKind, options: CleanupOptions, report: &mut CleanupReport) {
    let size = match kind {
        TargetKind::Directory => dir_size(path),
        TargetKind::File => fs::symlink_metadata(path).map(|m| m.len()).unwrap_or(0),
    };

    if options.dry_run {
        println!("Would remove: {}", path.display());
        report.removed.push(path.to_path_buf());
        report.bytes_freed += size;
        return;
    }

    let result = match kind {
        TargetKind::Directory => fs::remove_dir_all(path),
        TargetKind::File => fs::remove_file(path),
    };
    match result {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            report.removed.push(path.to_path_buf());
            report.bytes_freed += size;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            debug!(path = %path.display(), error = %err, "removal failed, ignoring");
            report.suppressed += 1;
        }
    }
}

/// Empty a runtime directory, then make sure it and its marker file exist
fn reset_runtime_dir(
    dir: &Path,
    marker: &str,
    options: CleanupOptions,
    report: &mut CleanupReport,
) -> Result<()> {
    // Follow links: a symlinked runtime directory keeps its link, only the target is emptied
    if fs::metadata(dir).is_ok_and(|meta| meta.is_dir()) {
        clear_dir_contents(dir, marker, options, report);
        return ensure_runtime_dir(dir, marker, options, report);
    }

    match fs::symlink_metadata(dir) {
        Ok(_) => {
            // A file or dangling link sits where the runtime directory belongs
            remove_entry(dir, TargetKind::File, options, report);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            debug!(path = %dir.display(), error = %err, "cannot stat runtime directory");
            report.suppressed += 1;
        }
    }

    ensure_runtime_dir(dir, marker, options, report)
}

/// Remove every entry of a runtime directory except a regular marker file
fn clear_dir_contents(
    dir: &Path,
    marker: &str,
    options: CleanupOptions,
    report: &mut CleanupReport,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(path = %dir.display(), error = %err, "cannot list runtime directory");
            report.suppressed += 1;
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            report.suppressed += 1;
            continue;
        };
        // The marker is recreated anyway; leaving it avoids churn under VCS
        if file_type.is_file() && entry.file_name() == marker {
            continue;
        }
        let kind = if file_type.is_dir() {
            TargetKind::Directory
        } else {
            TargetKind::File
        };
        remove_entry(&path, kind, options, report);
    }
}

fn ensure_runtime_dir(
    dir: &Path,
    marker: &str,
    options: CleanupOptions,
    report: &mut CleanupReport,
) -> Result<()> {
    if options.dry_run {
        println!("Would reset: {}", dir.display());
        report.reset_dirs.push(dir.to_path_buf());
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create runtime directory {}", dir.display()))?;

    let marker_path = dir.join(marker);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker_path)
        .with_context(|| format!("Failed to create marker file {}", marker_path.display()))?;

    debug!(path = %dir.display(), "runtime directory reset");
    report.reset_dirs.push(dir.to_path_buf());
    Ok(())
}

/// Calculate total size of a directory without following symlinks
fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;

    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if let Ok(metadata) = fs::symlink_metadata(&entry_path) {
                if metadata.is_file() {
                    total += metadata.len();
                } else if metadata.is_dir() {
                    total += dir_size(&entry_path);
                }
            }
        }
    }

    total
}
