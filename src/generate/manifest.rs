//! Dependency manifest of a module.
//!
//! The manifest lists a module's coordinates, its flattened dependencies and
//! its capabilities. One [`ResolvedManifest`] renders to any
//! [`ManifestFlavor`]; only the configured flavor is kept on disk.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::dependency::dedup_dependencies;
use crate::core::{DependencyKind, DependencyScope, Module, ModuleDependency, Target, Workspace};
use crate::generate::{Artifact, GenerateError, Transaction, GENERATED_HEADER};
use crate::resolver::find_best;

/// Output dialect of the manifest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFlavor {
    #[default]
    Toml,
    Json,
    Properties,
}

impl ManifestFlavor {
    pub const ALL: [ManifestFlavor; 3] = [
        ManifestFlavor::Toml,
        ManifestFlavor::Json,
        ManifestFlavor::Properties,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestFlavor::Toml => "toml",
            ManifestFlavor::Json => "json",
            ManifestFlavor::Properties => "properties",
        }
    }

    /// File name of the manifest in this flavor.
    pub fn file_name(&self) -> String {
        format!("module.{}", self.as_str())
    }

    /// Render a manifest.
    pub fn render(&self, manifest: &ResolvedManifest) -> Result<String, GenerateError> {
        let render_err = |source: Box<dyn std::error::Error + Send + Sync>| GenerateError::Render {
            artifact: "manifest",
            source,
        };
        match self {
            ManifestFlavor::Toml => {
                let body = toml::to_string(manifest).map_err(|e| render_err(Box::new(e)))?;
                Ok(format!("{GENERATED_HEADER}\n\n{body}"))
            }
            ManifestFlavor::Json => {
                let body = serde_json::to_string_pretty(manifest).map_err(|e| render_err(Box::new(e)))?;
                Ok(format!("{body}\n"))
            }
            ManifestFlavor::Properties => Ok(render_properties(manifest)),
        }
    }
}

impl fmt::Display for ManifestFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(ManifestFlavor::Toml),
            "json" => Ok(ManifestFlavor::Json),
            "properties" => Ok(ManifestFlavor::Properties),
            _ => Err(format!(
                "invalid manifest flavor '{}'; expected 'toml', 'json', or 'properties'",
                s
            )),
        }
    }
}

/// Module identity as written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestModule {
    pub name: String,
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub aggregate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// One flattened dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDependency {
    pub name: String,
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub kind: DependencyKind,
    /// Empty means every target
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestCapabilities {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub provides: BTreeMap<String, Vec<String>>,
}

/// Everything a manifest records about one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedManifest {
    pub module: ManifestModule,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ManifestDependency>,
    pub capabilities: ManifestCapabilities,
}

impl ResolvedManifest {
    /// Resolve the manifest of `module`.
    ///
    /// `requires` is the module's full requirement set (declared and found in
    /// sources), `order` the workspace-wide ascending module order.
    pub fn resolve(
        workspace: &Workspace,
        module: &Module,
        requires: &BTreeSet<String>,
        targets: &[Target],
        order: &[String],
    ) -> Self {
        let coords = module.coordinates();
        let dependencies = flatten_dependencies(workspace, module, requires, targets, order)
            .into_iter()
            .filter_map(|dep| {
                let target = workspace.module(&dep.to)?;
                let c = target.coordinates();
                Some(ManifestDependency {
                    name: dep.to.clone(),
                    group: c.group.clone(),
                    artifact: c.artifact.clone(),
                    version: c.version.to_string(),
                    kind: dep.kind,
                    targets: dep.scope.target_names().map(str::to_string).collect(),
                })
            })
            .collect();

        ResolvedManifest {
            module: ManifestModule {
                name: module.name().to_string(),
                group: coords.group.clone(),
                artifact: coords.artifact.clone(),
                version: coords.version.to_string(),
                aggregate: module.is_aggregate(),
                parent: module.parent().map(str::to_string),
            },
            dependencies,
            capabilities: ManifestCapabilities {
                requires: requires.iter().cloned().collect(),
                provides: module.provided().clone(),
            },
        }
    }
}

/// Flatten a module's dependency list for manifest emission.
///
/// Declared edges, edges re-exported through `api` dependencies, and one
/// implicit-provider edge per (target, required capability) whose best
/// provider is another module. The result is deduplicated and ordered by
/// position in `order`, then by name.
pub fn flatten_dependencies(
    workspace: &Workspace,
    module: &Module,
    requires: &BTreeSet<String>,
    targets: &[Target],
    order: &[String],
) -> Vec<ModuleDependency> {
    let mut edges = workspace.exported_dependencies(module.name());

    let scope: Vec<&Module> = workspace.modules().filter(|m| !m.is_aggregate()).collect();
    for target in targets {
        for capability in requires {
            let Some(provider) = find_best(scope.iter().copied(), capability, target) else {
                continue;
            };
            if provider.name() == module.name() {
                continue;
            }
            tracing::trace!(
                module = module.name(),
                capability = capability.as_str(),
                target = target.name(),
                provider = provider.name(),
                "implicit provider"
            );
            edges.push(
                ModuleDependency::new(module.name(), provider.name(), DependencyKind::ImplicitProvider)
                    .with_scope(DependencyScope::targets([target.name()])),
            );
        }
    }

    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let mut deps = dedup_dependencies(edges);
    deps.sort_by(|a, b| {
        let ra = rank.get(a.to.as_str()).copied().unwrap_or(usize::MAX);
        let rb = rank.get(b.to.as_str()).copied().unwrap_or(usize::MAX);
        ra.cmp(&rb)
            .then_with(|| a.to.cmp(&b.to))
            .then_with(|| a.kind.compat_class().cmp(&b.kind.compat_class()))
    });
    deps
}

fn render_properties(manifest: &ResolvedManifest) -> String {
    let m = &manifest.module;
    let mut lines = vec![
        GENERATED_HEADER.to_string(),
        format!("module.name={}", m.name),
        format!("module.group={}", m.group),
        format!("module.artifact={}", m.artifact),
        format!("module.version={}", m.version),
        format!("module.aggregate={}", m.aggregate),
    ];
    if let Some(parent) = &m.parent {
        lines.push(format!("module.parent={parent}"));
    }

    lines.push(format!("dependencies.count={}", manifest.dependencies.len()));
    for (i, dep) in manifest.dependencies.iter().enumerate() {
        lines.push(format!("dependency.{i}.name={}", dep.name));
        lines.push(format!(
            "dependency.{i}.coordinates={}:{}:{}",
            dep.group, dep.artifact, dep.version
        ));
        lines.push(format!("dependency.{i}.kind={}", dep.kind.as_str()));
        if !dep.targets.is_empty() {
            lines.push(format!("dependency.{i}.targets={}", dep.targets.join(",")));
        }
    }

    let caps = &manifest.capabilities;
    if !caps.requires.is_empty() {
        lines.push(format!("capabilities.requires={}", caps.requires.join(",")));
    }
    for (capability, classes) in &caps.provides {
        lines.push(format!("capabilities.provides.{capability}={}", classes.join(",")));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// The manifest file of one module.
#[derive(Debug, Clone)]
pub struct ManifestArtifact {
    pub dir: PathBuf,
    pub flavor: ManifestFlavor,
    pub manifest: ResolvedManifest,
}

impl Artifact for ManifestArtifact {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn plan(&self, tx: &Transaction<'_, '_>) -> Result<(), GenerateError> {
        tx.write(self.dir.join(self.flavor.file_name()), self.flavor.render(&self.manifest)?);
        for other in ManifestFlavor::ALL.iter().filter(|f| **f != self.flavor) {
            tx.delete(self.dir.join(other.file_name()));
        }
        Ok(())
    }
}
