//! Workspace - the module tree of one project.
//!
//! The workspace owns every module (containment is a tree rooted at the
//! project) and exposes the dependency graph, which is a separate structure
//! keyed by module name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::dependency::{DependencyKind, DependencyScope, ModuleDependency};
use crate::core::manifest::{ManifestError, ModuleManifest, ProjectManifest, MODULE_MANIFEST};
use crate::core::module::{default_sources, Coordinates, Module};
use crate::core::target::{targets_from_specs, Target};

/// Directories never searched for modules.
const SKIPPED_DIRS: &[&str] = &["build", "target", "node_modules"];

/// A project: its module tree and deployment targets.
#[derive(Debug)]
pub struct Workspace {
    /// Project root directory
    root: PathBuf,

    /// Name of the root module
    root_module: String,

    /// All modules by name
    modules: BTreeMap<String, Module>,

    /// Declared (or built-in) targets
    targets: Vec<Target>,
}

impl Workspace {
    /// Load a workspace from the path of its Shipyard.toml.
    pub fn new(manifest_path: &Path) -> Result<Self, ManifestError> {
        let manifest = ProjectManifest::load(manifest_path)?;
        let root = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let project = &manifest.project;
        let root_module = Module::new(
            project.name.clone(),
            Coordinates {
                group: project.group.clone().unwrap_or_default(),
                artifact: project.name.clone(),
                version: project.version.clone(),
            },
            root.clone(),
        )
        .with_aggregate(project.aggregate);

        let mut modules = vec![root_module];
        let mut dir_to_name: BTreeMap<PathBuf, String> = BTreeMap::new();
        dir_to_name.insert(root.clone(), project.name.clone());

        for dir in discover_module_dirs(&root) {
            let manifest = ModuleManifest::load(&dir.join(MODULE_MANIFEST))?;
            let parent_name = nearest_module(&dir, &root, &dir_to_name);
            let parent = modules
                .iter()
                .find(|m| m.name() == parent_name)
                .map(|m| m.coordinates().clone())
                .ok_or_else(|| ManifestError::MissingName { dir: dir.clone() })?;

            let module = module_from_manifest(&dir, manifest, &parent_name, &parent)?;
            tracing::debug!("discovered module `{}` at {}", module.name(), dir.display());
            dir_to_name.insert(dir, module.name().to_string());
            modules.push(module);
        }

        Self::from_modules(root, modules, targets_from_specs(&manifest.targets))
    }

    /// Assemble a workspace from already-built modules.
    ///
    /// The first module is the containment root. Names must be unique and
    /// every dependency must name a module and targets of the workspace.
    pub fn from_modules(
        root: PathBuf,
        modules: Vec<Module>,
        targets: Vec<Target>,
    ) -> Result<Self, ManifestError> {
        let root_module = modules
            .first()
            .map(|m| m.name().to_string())
            .ok_or_else(|| ManifestError::MissingName { dir: root.clone() })?;

        let mut by_name: BTreeMap<String, Module> = BTreeMap::new();
        for module in modules {
            if let Some(existing) = by_name.get(module.name()) {
                return Err(ManifestError::DuplicateModule {
                    name: module.name().to_string(),
                    first: existing.root().to_path_buf(),
                    second: module.root().to_path_buf(),
                });
            }
            by_name.insert(module.name().to_string(), module);
        }

        for module in by_name.values() {
            for dep in module.dependencies() {
                if !by_name.contains_key(&dep.to) {
                    return Err(ManifestError::UnknownDependency {
                        module: module.name().to_string(),
                        dependency: dep.to.clone(),
                    });
                }
                if let Some(target) = dep
                    .scope
                    .target_names()
                    .find(|t| !targets.iter().any(|known| known.name() == *t))
                {
                    return Err(ManifestError::UnknownDependencyTarget {
                        module: module.name().to_string(),
                        dependency: dep.to.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for module in by_name.values() {
            if let Some(parent) = module.parent() {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(module.name().to_string());
            }
        }
        for (parent, kids) in children {
            if let Some(module) = by_name.get_mut(&parent) {
                module.set_children(kids);
            }
        }

        Ok(Workspace {
            root,
            root_module,
            modules: by_name,
            targets,
        })
    }

    /// Get the project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the root module.
    pub fn root_module(&self) -> &Module {
        &self.modules[&self.root_module]
    }

    /// Get a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Iterate over all modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Get the number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the workspace has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Get all targets.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Result<&Target, ManifestError> {
        self.targets
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ManifestError::UnknownTarget {
                name: name.to_string(),
                known: self.targets.iter().map(|t| t.name().to_string()).collect(),
            })
    }

    /// Resolve a list of target names; an empty list selects every target.
    pub fn select_targets(&self, names: &[String]) -> Result<Vec<Target>, ManifestError> {
        if names.is_empty() {
            return Ok(self.targets.clone());
        }
        names
            .iter()
            .map(|name| self.target(name).cloned())
            .collect()
    }

    /// The dependency graph as module name -> direct dependency names.
    ///
    /// Every module appears as a key; optional edges are included.
    pub fn dependency_graph(&self) -> BTreeMap<String, Vec<String>> {
        self.modules
            .values()
            .map(|module| {
                let deps = module
                    .dependencies()
                    .iter()
                    .map(|d| d.to.clone())
                    .collect();
                (module.name().to_string(), deps)
            })
            .collect()
    }

    /// Declared dependencies of a module plus everything re-exported through
    /// `api` edges of its non-optional dependencies.
    ///
    /// Re-exported edges inherit the kind of the declaring edge. Their scope is
    /// the intersection of every scope along the path; a path whose scopes
    /// share no target re-exports nothing. Edges are not deduplicated here.
    pub fn exported_dependencies(&self, name: &str) -> Vec<ModuleDependency> {
        let Some(module) = self.module(name) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for direct in module.dependencies() {
            result.push(direct.clone());
            if !direct.is_transitive() {
                continue;
            }

            // Widest scope each module has been reached with so far
            let mut reached: HashMap<&str, DependencyScope> = HashMap::new();
            reached.insert(direct.to.as_str(), direct.scope.clone());
            let mut stack = vec![(direct.to.as_str(), direct.scope.clone())];

            while let Some((current, scope)) = stack.pop() {
                let Some(current) = self.module(current) else {
                    continue;
                };
                let api_edges = current
                    .dependencies()
                    .iter()
                    .filter(|d| d.kind == DependencyKind::Api && d.to != name);
                for api in api_edges {
                    let Some(narrowed) = scope.intersect(&api.scope) else {
                        tracing::trace!(
                            "`{}` -> `{}` not re-exported to `{}`: no common target",
                            current.name(),
                            api.to,
                            name
                        );
                        continue;
                    };
                    let widened = match reached.get(api.to.as_str()) {
                        Some(existing) => {
                            let merged = existing.union(&narrowed);
                            if merged == *existing {
                                continue;
                            }
                            merged
                        }
                        None => narrowed.clone(),
                    };
                    reached.insert(api.to.as_str(), widened);
                    result.push(
                        ModuleDependency::new(name, api.to.clone(), direct.kind)
                            .with_scope(narrowed.clone()),
                    );
                    stack.push((api.to.as_str(), narrowed));
                }
            }
        }
        result
    }

    /// Modules whose containment ancestor chain includes `ancestor`.
    pub fn descendants(&self, ancestor: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<&str> = vec![ancestor];
        while let Some(current) = stack.pop() {
            if let Some(module) = self.module(current) {
                for child in module.children() {
                    if result.insert(child.clone()) {
                        stack.push(child);
                    }
                }
            }
        }
        result
    }
}

/// Find module directories below `root`, sorted so parents come first.
fn discover_module_dirs(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        });

    let mut dirs = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.depth() > 0
                    && entry.file_type().is_file()
                    && entry.file_name() == MODULE_MANIFEST
                {
                    if let Some(parent) = entry.path().parent() {
                        if parent != root {
                            dirs.push(parent.to_path_buf());
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("skipping unreadable entry: {}", e),
        }
    }

    dirs.sort_by_key(|d| d.components().count());
    dirs
}

/// Name of the closest ancestor directory that holds a module.
fn nearest_module(dir: &Path, root: &Path, known: &BTreeMap<PathBuf, String>) -> String {
    let mut current = dir.parent();
    while let Some(candidate) = current {
        if let Some(name) = known.get(candidate) {
            return name.clone();
        }
        if candidate == root {
            break;
        }
        current = candidate.parent();
    }
    known.get(root).cloned().unwrap_or_default()
}

fn module_from_manifest(
    dir: &Path,
    manifest: ModuleManifest,
    parent_name: &str,
    parent: &Coordinates,
) -> Result<Module, ManifestError> {
    let section = manifest.module;
    let name = match section.name {
        Some(name) => name,
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ManifestError::MissingName {
                dir: dir.to_path_buf(),
            })?,
    };

    let coordinates = Coordinates {
        group: section.group.unwrap_or_else(|| parent.group.clone()),
        artifact: section.artifact.unwrap_or_else(|| name.clone()),
        version: section.version.unwrap_or_else(|| parent.version.clone()),
    };

    let dependencies = manifest
        .dependencies
        .iter()
        .map(|(to, spec)| spec.to_dependency(&name, to))
        .collect();

    let mut module = Module::new(name, coordinates, dir)
        .with_parent(Some(parent_name.to_string()))
        .with_aggregate(section.aggregate)
        .with_dependencies(dependencies)
        .with_provides(manifest.capabilities.provides)
        .with_requires(manifest.capabilities.requires)
        .with_compatibility(manifest.compatibility)
        .with_sources(section.sources.unwrap_or_else(default_sources));
    if let Some(resources) = section.resources {
        module = module.with_resources(resources);
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WorkspaceFixture;

    #[test]
    fn test_discovers_nested_modules() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "")
            .module("backends/web", "[dependencies]\ncore = \"api\"\n")
            .module("backends/web/extras", "[module]\nname = \"web-extras\"\n")
            .write();

        let ws = fixture.workspace();
        assert_eq!(ws.len(), 4);
        assert_eq!(ws.root_module().name(), "demo");
        assert!(ws.root_module().is_aggregate());

        let extras = ws.module("web-extras").unwrap();
        assert_eq!(extras.parent(), Some("web"));
        assert_eq!(ws.module("web").unwrap().parent(), Some("demo"));
        assert_eq!(ws.module("web").unwrap().children(), ["web-extras".to_string()]);
    }

    #[test]
    fn test_coordinates_inherited() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "[module]\nversion = \"2.0.0\"\n")
            .module("core/sub", "")
            .write();

        let ws = fixture.workspace();
        let sub = ws.module("sub").unwrap();
        assert_eq!(sub.coordinates().group, "com.example");
        assert_eq!(sub.coordinates().version.to_string(), "2.0.0");
        assert_eq!(sub.coordinates().artifact, "sub");
    }

    #[test]
    fn test_skips_build_and_hidden_dirs() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "")
            .module("core/build/stale", "")
            .module(".cache/junk", "")
            .write();

        let ws = fixture.workspace();
        assert!(ws.module("stale").is_none());
        assert!(ws.module("junk").is_none());
    }

    #[test]
    fn test_unknown_dependency_is_error() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "[dependencies]\nmissing = \"api\"\n")
            .write();

        let err = Workspace::new(&fixture.manifest_path()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownDependency { .. }));
    }

    #[test]
    fn test_duplicate_module_is_error() {
        let fixture = WorkspaceFixture::new("demo")
            .module("a/core", "")
            .module("b/core", "")
            .write();

        let err = Workspace::new(&fixture.manifest_path()).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateModule { .. }));
    }

    #[test]
    fn test_exported_dependencies_follow_api_edges() {
        let fixture = WorkspaceFixture::new("demo")
            .module("app", "[dependencies]\nui = \"implementation\"\n")
            .module("ui", "[dependencies]\ncore = \"api\"\nlog = \"implementation\"\n")
            .module("core", "[dependencies]\nmath = \"api\"\n")
            .module("math", "")
            .module("log", "")
            .write();

        let ws = fixture.workspace();
        let deps = ws.exported_dependencies("app");
        let names: Vec<_> = deps.iter().map(|d| d.to.as_str()).collect();
        assert_eq!(names, vec!["ui", "core", "math"]);
        assert!(deps.iter().all(|d| d.kind == DependencyKind::Implementation));
    }

    #[test]
    fn test_exported_scope_is_intersection_along_path() {
        let fixture = WorkspaceFixture::new("demo")
            .module(
                "app",
                "[dependencies]\nui = { kind = \"implementation\", targets = [\"web\", \"ios\"] }\n",
            )
            .module(
                "ui",
                "[dependencies]\ncore = { kind = \"api\", targets = [\"desktop\"] }\ngfx = { kind = \"api\", targets = [\"web\", \"desktop\"] }\n",
            )
            .module("gfx", "[dependencies]\nmath = \"api\"\nshaders = { kind = \"api\", targets = [\"ios\"] }\n")
            .module("core", "[dependencies]\nlog = \"api\"\n")
            .module("math", "")
            .module("shaders", "")
            .module("log", "")
            .write();

        let ws = fixture.workspace();
        let deps = ws.exported_dependencies("app");
        let scopes: Vec<_> = deps
            .iter()
            .map(|d| (d.to.as_str(), d.scope.target_names().collect::<Vec<_>>()))
            .collect();

        // core is desktop-only and nothing past it is reached
        assert_eq!(
            scopes,
            vec![
                ("ui", vec!["ios", "web"]),
                ("gfx", vec!["web"]),
                ("math", vec!["web"]),
            ]
        );
    }

    #[test]
    fn test_exported_scope_widens_through_second_path() {
        let fixture = WorkspaceFixture::new("demo")
            .module(
                "app",
                "[dependencies]\nui = { kind = \"implementation\", targets = [\"web\"] }\nnet = { kind = \"implementation\", targets = [\"ios\"] }\n",
            )
            .module("ui", "[dependencies]\ncore = \"api\"\n")
            .module("net", "[dependencies]\ncore = \"api\"\n")
            .module("core", "")
            .write();

        let ws = fixture.workspace();
        let core: Vec<_> = ws
            .exported_dependencies("app")
            .into_iter()
            .filter(|d| d.to == "core")
            .collect();
        assert_eq!(core.len(), 2);
        assert_eq!(core[0].scope, DependencyScope::targets(["web"]));
        assert_eq!(core[1].scope, DependencyScope::targets(["ios"]));
    }

    #[test]
    fn test_unknown_dependency_target_is_error() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "")
            .module(
                "app",
                "[dependencies]\ncore = { kind = \"api\", targets = [\"wbe\"] }\n",
            )
            .write();

        let err = Workspace::new(&fixture.manifest_path()).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::UnknownDependencyTarget { ref target, .. } if target == "wbe"
        ));
        assert!(err.to_string().contains("unknown target `wbe`"));
    }

    #[test]
    fn test_select_targets() {
        let fixture = WorkspaceFixture::new("demo").write();
        let ws = fixture.workspace();

        assert_eq!(ws.select_targets(&[]).unwrap().len(), 3);
        let web = ws.select_targets(&["web".to_string()]).unwrap();
        assert_eq!(web[0].name(), "web");
        assert!(ws.select_targets(&["wasm".to_string()]).is_err());
    }

    #[test]
    fn test_dependency_graph_lists_every_module() {
        let fixture = WorkspaceFixture::new("demo")
            .module("a", "[dependencies]\nb = \"api\"\n")
            .module("b", "")
            .write();

        let graph = fixture.workspace().dependency_graph();
        assert_eq!(graph["a"], vec!["b".to_string()]);
        assert!(graph["b"].is_empty());
        assert!(graph.contains_key("demo"));
    }
}
