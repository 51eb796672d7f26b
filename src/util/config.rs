//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.shipyard/config.toml` - user-wide defaults
//! - Project: `<project>/.shipyard/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config, and command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::generate::ManifestFlavor;

/// Default directory of generated artifacts, relative to each module.
pub const DEFAULT_OUTPUT_DIR: &str = "build/generated";

/// Shipyard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generate: GenerateConfig,

    /// External commands
    pub hooks: HooksConfig,
}

/// `[generate]` settings. Unset fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GenerateConfig {
    /// Manifest dialect
    pub flavor: Option<ManifestFlavor>,

    /// Output directory relative to each module
    pub output_dir: Option<PathBuf>,

    /// Fail on dependency cycles instead of ordering them best-effort
    pub strict_cycles: Option<bool>,

    /// Threads used for source analysis (None = auto-detect)
    pub jobs: Option<usize>,

    /// Capability lookup regex; group 1 is the type argument
    pub capability_pattern: Option<String>,

    /// Reflective array creation regex; group 1 is the element type
    pub array_pattern: Option<String>,
}

/// `[hooks]` commands, each an argv list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HooksConfig {
    /// Run in the project root after a successful generate
    pub after_generate: Vec<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let g = other.generate;
        if g.flavor.is_some() {
            self.generate.flavor = g.flavor;
        }
        if g.output_dir.is_some() {
            self.generate.output_dir = g.output_dir;
        }
        if g.strict_cycles.is_some() {
            self.generate.strict_cycles = g.strict_cycles;
        }
        if g.jobs.is_some() {
            self.generate.jobs = g.jobs;
        }
        if g.capability_pattern.is_some() {
            self.generate.capability_pattern = g.capability_pattern;
        }
        if g.array_pattern.is_some() {
            self.generate.array_pattern = g.array_pattern;
        }

        // Hook lists replace rather than append
        if !other.hooks.after_generate.is_empty() {
            self.hooks.after_generate = other.hooks.after_generate;
        }
    }

    /// Get the manifest flavor.
    pub fn flavor(&self) -> ManifestFlavor {
        self.generate.flavor.unwrap_or_default()
    }

    /// Get the output directory relative to a module.
    pub fn output_dir(&self) -> PathBuf {
        self.generate
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn strict_cycles(&self) -> bool {
        self.generate.strict_cycles.unwrap_or(false)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.shipyard/config.toml)
/// 2. Global config (~/.shipyard/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global shipyard config directory (~/.shipyard).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".shipyard"))
}

/// Get the global config path (~/.shipyard/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.shipyard/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".shipyard").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.flavor(), ManifestFlavor::Toml);
        assert_eq!(config.output_dir(), PathBuf::from("build/generated"));
        assert!(!config.strict_cycles());
        assert!(config.hooks.after_generate.is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[generate]
flavor = "json"
output-dir = "gen"
strict-cycles = true
jobs = 8
capability-pattern = 'Services\.load\((\w+)\.class\)'

[hooks]
after-generate = [["./gradlew", "syncGenerated"]]
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.flavor(), ManifestFlavor::Json);
        assert_eq!(config.output_dir(), PathBuf::from("gen"));
        assert!(config.strict_cycles());
        assert_eq!(config.generate.jobs, Some(8));
        assert_eq!(
            config.generate.capability_pattern.as_deref(),
            Some(r"Services\.load\((\w+)\.class\)")
        );
        assert_eq!(config.hooks.after_generate, vec![vec!["./gradlew", "syncGenerated"]]);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.generate.flavor = Some(ManifestFlavor::Properties);
        base.generate.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.generate.flavor = Some(ManifestFlavor::Json);

        base.merge(override_cfg);

        assert_eq!(base.flavor(), ManifestFlavor::Json);
        assert_eq!(base.generate.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_broken_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[generate\nflavor = ").unwrap();

        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_or_default(&path).flavor(), ManifestFlavor::Toml);
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(&global_path, "[generate]\nflavor = \"json\"\njobs = 2\n").unwrap();
        std::fs::write(&project_path, "[generate]\nflavor = \"properties\"\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);
        assert_eq!(config.flavor(), ManifestFlavor::Properties);
        assert_eq!(config.generate.jobs, Some(2));

        let missing = load_config(None, &tmp.path().join("absent.toml"));
        assert_eq!(missing.flavor(), ManifestFlavor::Toml);
    }
}
