//! Shipyard.toml and Module.toml parsing and schema.
//!
//! `Shipyard.toml` sits at the project root and describes the root module
//! plus the deployment targets. Every other module lives in a directory
//! containing a `Module.toml`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::dependency::DependencySpec;
use crate::core::target::{TargetRequirement, TargetSpec};

/// Project manifest file name.
pub const PROJECT_MANIFEST: &str = "Shipyard.toml";

/// Module manifest file name.
pub const MODULE_MANIFEST: &str = "Module.toml";

/// Errors raised while loading manifests and assembling the workspace.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find Shipyard.toml in {} or any parent directory", .dir.display())]
    NotFound { dir: PathBuf },

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("module `{name}` is declared twice ({} and {})", .first.display(), .second.display())]
    DuplicateModule {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("module `{module}` depends on unknown module `{dependency}`")]
    UnknownDependency { module: String, dependency: String },

    #[error("dependency `{module}` -> `{dependency}` names unknown target `{target}`")]
    UnknownDependencyTarget {
        module: String,
        dependency: String,
        target: String,
    },

    #[error("unknown target `{name}` (known targets: {})", .known.join(", "))]
    UnknownTarget { name: String, known: Vec<String> },

    #[error("module at {} has no usable name", .dir.display())]
    MissingName { dir: PathBuf },
}

/// Contents of Shipyard.toml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectManifest {
    pub project: ProjectSection,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetSpec>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSection {
    pub name: String,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default = "default_version")]
    pub version: Version,

    /// The root is a pure container unless it says otherwise.
    #[serde(default = "default_true")]
    pub aggregate: bool,
}

fn default_version() -> Version {
    Version::new(0, 1, 0)
}

fn default_true() -> bool {
    true
}

impl ProjectManifest {
    /// Load Shipyard.toml from a path.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = read_manifest(path)?;
        Self::parse(&content, path)
    }

    /// Parse Shipyard.toml content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Contents of Module.toml.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleManifest {
    pub module: ModuleSection,
    pub dependencies: BTreeMap<String, DependencySpec>,
    pub capabilities: CapabilitySection,
    pub compatibility: TargetRequirement,
}

/// `[module]` section. Every field is optional; missing coordinates are
/// inherited from the containment parent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleSection {
    pub name: Option<String>,
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<Version>,
    pub aggregate: bool,
    pub sources: Option<Vec<String>>,
    pub resources: Option<PathBuf>,
}

/// `[capabilities]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CapabilitySection {
    /// Capability names this module looks up at runtime
    pub requires: BTreeSet<String>,

    /// Capability name -> implementation classes
    pub provides: BTreeMap<String, Vec<String>>,
}

impl ModuleManifest {
    /// Load Module.toml from a path.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = read_manifest(path)?;
        Self::parse(&content, path)
    }

    /// Parse Module.toml content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Find Shipyard.toml in `dir` or any parent directory.
pub fn find_project_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    let mut current = dir.to_path_buf();
    loop {
        let candidate = current.join(PROJECT_MANIFEST);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ManifestError::NotFound {
                dir: dir.to_path_buf(),
            });
        }
    }
}
