//! Modules - the nodes of both the containment tree and the dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use semver::Version;

use crate::core::dependency::ModuleDependency;
use crate::core::target::{Target, TargetRequirement};

/// Maven-style coordinates of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group: String,
    pub artifact: String,
    pub version: Version,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// A named unit of source and build configuration.
#[derive(Debug, Clone)]
pub struct Module {
    /// Unique name within the workspace
    name: String,

    /// Published coordinates
    coordinates: Coordinates,

    /// Module directory
    root: PathBuf,

    /// Containment parent (None for the project root)
    parent: Option<String>,

    /// Contained modules, sorted by name
    children: Vec<String>,

    /// Container-only module with no sources
    aggregate: bool,

    /// Declared direct dependencies
    dependencies: Vec<ModuleDependency>,

    /// Capability name -> implementation classes
    provides: BTreeMap<String, Vec<String>>,

    /// Declared required capability names
    requires: BTreeSet<String>,

    /// What a target must offer for this module to run on it
    compatibility: TargetRequirement,

    /// Source glob patterns, relative to the module root
    sources: Vec<String>,

    /// Embedded resource directory, relative to the module root
    resources: PathBuf,
}

impl Module {
    /// Create a module with default settings.
    pub fn new(name: impl Into<String>, coordinates: Coordinates, root: impl Into<PathBuf>) -> Self {
        Module {
            name: name.into(),
            coordinates,
            root: root.into(),
            parent: None,
            children: Vec::new(),
            aggregate: false,
            dependencies: Vec::new(),
            provides: BTreeMap::new(),
            requires: BTreeSet::new(),
            compatibility: TargetRequirement::default(),
            sources: default_sources(),
            resources: PathBuf::from("resources"),
        }
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ModuleDependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Declare a provided capability implemented by `class`.
    pub fn with_provided(mut self, capability: impl Into<String>, class: impl Into<String>) -> Self {
        self.provides
            .entry(capability.into())
            .or_default()
            .push(class.into());
        self
    }

    pub fn with_provides(mut self, provides: BTreeMap<String, Vec<String>>) -> Self {
        self.provides = provides;
        self
    }

    pub fn with_requires(mut self, requires: BTreeSet<String>) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_compatibility(mut self, compatibility: TargetRequirement) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_resources(mut self, resources: impl Into<PathBuf>) -> Self {
        self.resources = resources.into();
        self
    }

    pub(crate) fn set_children(&mut self, children: Vec<String>) {
        self.children = children;
    }

    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the module coordinates.
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Get the module directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the containment parent.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Get the contained modules.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Check if this is a container-only module.
    pub fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    /// Get the declared direct dependencies.
    pub fn dependencies(&self) -> &[ModuleDependency] {
        &self.dependencies
    }

    /// Get the declared capability implementations.
    pub fn provided(&self) -> &BTreeMap<String, Vec<String>> {
        &self.provides
    }

    /// Get the implementation classes for a capability.
    pub fn implementations(&self, capability: &str) -> &[String] {
        self.provides
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check if the module provides a capability.
    pub fn provides(&self, capability: &str) -> bool {
        !self.implementations(capability).is_empty()
    }

    /// Get the declared required capabilities.
    pub fn requires(&self) -> &BTreeSet<String> {
        &self.requires
    }

    /// Get the target compatibility requirement.
    pub fn compatibility(&self) -> &TargetRequirement {
        &self.compatibility
    }

    /// Check if the module can run on a target.
    pub fn is_compatible(&self, target: &Target) -> bool {
        self.compatibility.is_satisfied_by(target)
    }

    /// Grade how specifically the module matches a target.
    pub fn grade_target_match(&self, target: &Target) -> i32 {
        self.compatibility.grade(target)
    }

    /// Get the source glob patterns.
    pub fn source_patterns(&self) -> &[String] {
        &self.sources
    }

    /// Get the absolute resource directory.
    pub fn resource_dir(&self) -> PathBuf {
        self.root.join(&self.resources)
    }
}

/// Default source globs for a module.
pub fn default_sources() -> Vec<String> {
    vec!["src/**/*.java".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::WEB_TRANSPILED;

    fn coords(name: &str) -> Coordinates {
        Coordinates {
            group: "com.acme".to_string(),
            artifact: name.to_string(),
            version: Version::new(1, 0, 0),
        }
    }

    #[test]
    fn test_provides() {
        let module = Module::new("web", coords("web"), "/tmp/web")
            .with_provided("com.acme.spi.Renderer", "com.acme.web.WebRenderer");

        assert!(module.provides("com.acme.spi.Renderer"));
        assert!(!module.provides("com.acme.spi.Audio"));
        assert_eq!(
            module.implementations("com.acme.spi.Renderer"),
            ["com.acme.web.WebRenderer".to_string()]
        );
    }

    #[test]
    fn test_compatibility() {
        let module = Module::new("web", coords("web"), "/tmp/web")
            .with_compatibility(TargetRequirement::tags([WEB_TRANSPILED]));

        let web = Target::new("web", [WEB_TRANSPILED]);
        let desktop = Target::new("desktop", ["native-runtime"]);
        assert!(module.is_compatible(&web));
        assert!(!module.is_compatible(&desktop));
        assert_eq!(module.grade_target_match(&web), 3);
    }

    #[test]
    fn test_coordinates_display() {
        assert_eq!(coords("core").to_string(), "com.acme:core:1.0.0");
    }
}
