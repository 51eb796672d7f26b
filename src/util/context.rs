//! Global context for Shipyard operations.
//!
//! Provides centralized access to the working directory, configuration
//! locations and the enclosing project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::find_project_manifest;
use crate::core::{ManifestError, Workspace};
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Shipyard data (~/.shipyard/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(".shipyard"));
        GlobalContext { cwd, home }
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Shipyard home directory (~/.shipyard/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Find Shipyard.toml starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        find_project_manifest(&self.cwd)
    }

    /// Find the project root (directory containing Shipyard.toml).
    pub fn find_project_root(&self) -> Result<PathBuf, ManifestError> {
        let manifest = self.find_manifest()?;
        Ok(manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone()))
    }

    /// Load the enclosing workspace.
    pub fn workspace(&self) -> Result<Workspace> {
        let manifest = self.find_manifest()?;
        tracing::debug!("loading workspace from {}", manifest.display());
        let ws = Workspace::new(&manifest)?;
        Ok(ws)
    }

    /// Load the merged global and project configuration for `project_root`.
    pub fn config(&self, project_root: &Path) -> Config {
        load_config(Some(&self.config_path()), &project_config_path(project_root))
    }
}
