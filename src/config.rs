//! Cleanup targets and pipeline commands, loaded from defaults.toml and an optional
//! per-project repokeep.toml.

use crate::patterns::{is_confined_relative, tree_patterns, TreePattern};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

// Embed the defaults directly in the binary at compile time
const DEFAULTS_TOML: &str = include_str!("../defaults.toml");

/// Name of the optional per-project override file
pub const CONFIG_FILE_NAME: &str = "repokeep.toml";

/// Names matched anywhere below the project root
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeSection {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Paths relative to the project root
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootSection {
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// Runtime data directories reset to hold only the marker file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    pub marker: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretsSection {
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// External commands run by `check`, each as an argv list
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Executable cleanup script to delegate to; an empty string disables delegation
    pub cleanup_hook: PathBuf,
    pub lint: Vec<String>,
    pub format: Vec<String>,
    pub test: Vec<String>,
}

impl PipelineSection {
    pub fn cleanup_hook(&self) -> Option<&Path> {
        if self.cleanup_hook.as_os_str().is_empty() {
            None
        } else {
            Some(&self.cleanup_hook)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub tree: TreeSection,
    pub root: RootSection,
    pub runtime: RuntimeSection,
    pub secrets: SecretsSection,
    pub pipeline: PipelineSection,
}

/// Per-key pipeline overrides so a project can change one command only
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineOverrides {
    cleanup_hook: Option<PathBuf>,
    lint: Option<Vec<String>>,
    format: Option<Vec<String>>,
    test: Option<Vec<String>>,
}

/// Shape of repokeep.toml: target sections replace the defaults wholesale
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    tree: Option<TreeSection>,
    root: Option<RootSection>,
    runtime: Option<RuntimeSection>,
    secrets: Option<SecretsSection>,
    #[serde(default)]
    pipeline: PipelineOverrides,
}

impl Config {
    /// Parse the embedded defaults
    pub fn builtin() -> Result<Self> {
        let config: Config =
            toml::from_str(DEFAULTS_TOML).context("Failed to parse built-in defaults")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the defaults and apply `<root>/repokeep.toml` when it exists
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Self::builtin();
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::with_overrides(&content).with_context(|| format!("Invalid {}", path.display()))
    }

    /// Apply override TOML content on top of the defaults
    pub fn with_overrides(content: &str) -> Result<Self> {
        let overrides: ConfigOverrides =
            toml::from_str(content).context("Failed to parse configuration TOML")?;
        let mut config: Config =
            toml::from_str(DEFAULTS_TOML).context("Failed to parse built-in defaults")?;

        if let Some(tree) = overrides.tree {
            config.tree = tree;
        }
        if let Some(root) = overrides.root {
            config.root = root;
        }
        if let Some(runtime) = overrides.runtime {
            config.runtime = runtime;
        }
        if let Some(secrets) = overrides.secrets {
            config.secrets = secrets;
        }

        let pipeline = overrides.pipeline;
        if let Some(hook) = pipeline.cleanup_hook {
            config.pipeline.cleanup_hook = hook;
        }
        if let Some(lint) = pipeline.lint {
            config.pipeline.lint = lint;
        }
        if let Some(format) = pipeline.format {
            config.pipeline.format = format;
        }
        if let Some(test) = pipeline.test {
            config.pipeline.test = test;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn tree_patterns(&self) -> Vec<TreePattern> {
        tree_patterns(&self.tree.directories, &self.tree.files)
    }

    /// Reject anything that would let cleanup reach outside the project root
    fn validate(&self) -> Result<()> {
        for name in self.tree.directories.iter().chain(&self.tree.files) {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                bail!("Tree pattern must be a single file name, got: {:?}", name);
            }
        }

        let relative_paths = self
            .root
            .directories
            .iter()
            .chain(&self.root.files)
            .chain(&self.runtime.directories)
            .chain(&self.secrets.files);
        for path in relative_paths {
            if !is_confined_relative(path) {
                bail!(
                    "Path must be relative to the project root without '..': {}",
                    path.display()
                );
            }
        }

        let marker = Path::new(&self.runtime.marker);
        if marker.components().count() != 1 || !is_confined_relative(marker) {
            bail!(
                "Runtime marker must be a plain file name, got: {:?}",
                self.runtime.marker
            );
        }

        if let Some(hook) = self.pipeline.cleanup_hook() {
            if !is_confined_relative(hook) {
                bail!(
                    "Cleanup hook must be relative to the project root: {}",
                    hook.display()
                );
            }
        }

        for (name, argv) in [
            ("lint", &self.pipeline.lint),
            ("format", &self.pipeline.format),
            ("test", &self.pipeline.test),
        ] {
            if argv.first().map_or(true, |program| program.is_empty()) {
                bail!("Pipeline command '{}' must name a program", name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_defaults() {
        let config = Config::builtin().unwrap();

        assert_eq!(config.tree.directories, vec!["__pycache__"]);
        assert!(config.tree.files.contains(&"*.pyc".to_string()));
        assert!(config.tree.files.contains(&".DS_Store".to_string()));
        assert!(config.root.directories.contains(&PathBuf::from(".pytest_cache")));
        assert!(config.root.files.contains(&PathBuf::from(".coverage")));
        assert_eq!(
            config.runtime.directories,
            vec![PathBuf::from("data/uploads"), PathBuf::from("data/processed")]
        );
        assert_eq!(config.runtime.marker, ".gitkeep");
        assert_eq!(config.secrets.files, vec![PathBuf::from(".env")]);
        assert_eq!(
            config.pipeline.cleanup_hook(),
            Some(Path::new("scripts/cleanup.sh"))
        );
        assert_eq!(config.pipeline.lint, vec!["ruff", "check", ".", "--fix"]);
        assert_eq!(config.pipeline.test, vec!["pytest", "-q"]);
    }

    #[test]
    fn test_pipeline_override_is_per_key() {
        let config = Config::with_overrides("[pipeline]\ntest = [\"pytest\", \"-x\"]\n").unwrap();

        assert_eq!(config.pipeline.test, vec!["pytest", "-x"]);
        assert_eq!(config.pipeline.lint, vec!["ruff", "check", ".", "--fix"]);
    }

    #[test]
    fn test_section_override_replaces_section() {
        let config =
            Config::with_overrides("[runtime]\ndirectories = [\"var/cache\"]\nmarker = \".keep\"\n")
                .unwrap();

        assert_eq!(config.runtime.directories, vec![PathBuf::from("var/cache")]);
        assert_eq!(config.runtime.marker, ".keep");
        // Untouched sections keep their defaults
        assert_eq!(config.secrets.files, vec![PathBuf::from(".env")]);
    }

    #[test]
    fn test_empty_hook_disables_delegation() {
        let config = Config::with_overrides("[pipeline]\ncleanup_hook = \"\"\n").unwrap();
        assert!(config.pipeline.cleanup_hook().is_none());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let err = Config::with_overrides("[secrets]\nfiles = [\"../.env\"]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("without '..'"));

        assert!(Config::with_overrides("[root]\nfiles = [\"/etc/passwd\"]\n").is_err());
        assert!(Config::with_overrides("[pipeline]\ncleanup_hook = \"/bin/true\"\n").is_err());
    }

    #[test]
    fn test_rejects_bad_marker_and_patterns() {
        assert!(
            Config::with_overrides("[runtime]\ndirectories = []\nmarker = \"a/b\"\n").is_err()
        );
        assert!(Config::with_overrides("[tree]\nfiles = [\"src/*.pyc\"]\n").is_err());
    }

    #[test]
    fn test_rejects_empty_command() {
        let err = Config::with_overrides("[pipeline]\nlint = []\n").unwrap_err();
        assert!(format!("{:#}", err).contains("'lint' must name a program"));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(Config::with_overrides("[pipeline]\nlnt = [\"ruff\"]\n").is_err());
        assert!(Config::with_overrides("[extras]\nfoo = 1\n").is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pipeline.format, vec!["ruff", "format", "."]);
    }

    #[test]
    fn test_load_reads_project_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[pipeline]\nformat = [\"black\", \".\"]\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pipeline.format, vec!["black", "."]);
    }

    #[test]
    fn test_load_reports_file_name_on_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "not = [valid").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(CONFIG_FILE_NAME));
    }
}
