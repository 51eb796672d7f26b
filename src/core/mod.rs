//! Core data structures for Shipyard.
//!
//! This module contains the foundational types used throughout Shipyard:
//! - Modules, their coordinates and capabilities
//! - Dependency edges and their kinds
//! - Deployment targets and compatibility requirements
//! - Manifests and the workspace module tree

pub mod dependency;
pub mod manifest;
pub mod module;
pub mod target;
pub mod workspace;

pub use dependency::{DependencyKind, DependencyScope, ModuleDependency};
pub use manifest::{ManifestError, MODULE_MANIFEST, PROJECT_MANIFEST};
pub use module::{Coordinates, Module};
pub use target::{Target, TargetRequirement};
pub use workspace::Workspace;
