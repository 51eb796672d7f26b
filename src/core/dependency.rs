//! Module dependency edges.
//!
//! A [`ModuleDependency`] is an edge in the dependency graph (which is
//! unrelated to the containment tree). Edges carry a [`DependencyKind`] and a
//! [`DependencyScope`] restricting them to a subset of targets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How a module uses one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Part of the public surface; re-exported to dependents
    Api,
    /// Used internally only
    Implementation,
    /// Only used when present
    Optional,
    /// Added by capability resolution, never declared
    ImplicitProvider,
}

impl DependencyKind {
    /// Get the kind name as it appears in manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Api => "api",
            DependencyKind::Implementation => "implementation",
            DependencyKind::Optional => "optional",
            DependencyKind::ImplicitProvider => "implicit-provider",
        }
    }

    /// Kinds in the same class are interchangeable when deduplicating.
    pub fn compat_class(&self) -> CompatClass {
        match self {
            DependencyKind::Optional => CompatClass::Optional,
            _ => CompatClass::Required,
        }
    }

    /// Strength used to pick a winner when two compatible edges merge.
    fn strength(&self) -> u8 {
        match self {
            DependencyKind::Api => 3,
            DependencyKind::Implementation => 2,
            DependencyKind::ImplicitProvider => 1,
            DependencyKind::Optional => 0,
        }
    }

    /// Return the stronger of two kinds.
    pub fn strongest(self, other: DependencyKind) -> DependencyKind {
        if other.strength() > self.strength() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = DependencyKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(DependencyKind::Api),
            "implementation" | "impl" => Ok(DependencyKind::Implementation),
            "optional" => Ok(DependencyKind::Optional),
            "implicit-provider" => Ok(DependencyKind::ImplicitProvider),
            _ => Err(DependencyKindParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid dependency kind.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid dependency kind '{0}', valid values: api, implementation, optional")]
pub struct DependencyKindParseError(pub String);

/// Deduplication class of a dependency kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompatClass {
    Required,
    Optional,
}

/// The set of targets an edge applies to. Empty means every target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyScope {
    targets: BTreeSet<String>,
}

impl DependencyScope {
    /// A scope covering every target.
    pub fn all() -> Self {
        DependencyScope::default()
    }

    /// A scope restricted to the given targets.
    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DependencyScope {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the scope covers every target.
    pub fn is_all(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check if the scope applies to a target.
    pub fn includes(&self, target: &str) -> bool {
        self.is_all() || self.targets.contains(target)
    }

    /// Get the explicit target names (empty when the scope covers all).
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Union of two scopes. An unrestricted scope absorbs everything.
    pub fn union(&self, other: &DependencyScope) -> DependencyScope {
        if self.is_all() || other.is_all() {
            return DependencyScope::all();
        }
        DependencyScope {
            targets: self.targets.union(&other.targets).cloned().collect(),
        }
    }

    /// Intersection of two scopes, or `None` when they share no target.
    pub fn intersect(&self, other: &DependencyScope) -> Option<DependencyScope> {
        if self.is_all() {
            return Some(other.clone());
        }
        if other.is_all() {
            return Some(self.clone());
        }
        let targets: BTreeSet<String> = self.targets.intersection(&other.targets).cloned().collect();
        if targets.is_empty() {
            None
        } else {
            Some(DependencyScope { targets })
        }
    }
}

/// A dependency edge between two modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDependency {
    /// Depending module
    pub from: String,

    /// Module depended upon
    pub to: String,

    /// How the dependency is used
    pub kind: DependencyKind,

    /// Targets the edge applies to
    pub scope: DependencyScope,
}

impl ModuleDependency {
    /// Create an unscoped edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: DependencyKind) -> Self {
        ModuleDependency {
            from: from.into(),
            to: to.into(),
            kind,
            scope: DependencyScope::all(),
        }
    }

    /// Restrict the edge to a scope.
    pub fn with_scope(mut self, scope: DependencyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Check if the edge is followed when collecting transitive dependencies.
    pub fn is_transitive(&self) -> bool {
        self.kind != DependencyKind::Optional
    }
}

/// Dependency specification as it appears in Module.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Kind only: `util = "api"`
    Simple(DependencyKind),

    /// Detailed specification
    Detailed(DetailedDependencySpec),
}

/// Detailed dependency specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedDependencySpec {
    #[serde(default = "default_kind")]
    pub kind: DependencyKind,

    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_kind() -> DependencyKind {
    DependencyKind::Implementation
}

impl DependencySpec {
    /// Turn this declaration into an edge from `from` to `to`.
    pub fn to_dependency(&self, from: &str, to: &str) -> ModuleDependency {
        match self {
            DependencySpec::Simple(kind) => ModuleDependency::new(from, to, *kind),
            DependencySpec::Detailed(spec) => ModuleDependency::new(from, to, spec.kind)
                .with_scope(DependencyScope::targets(spec.targets.iter().cloned())),
        }
    }
}

/// Deduplicate edges by (destination, compatibility class).
///
/// The first occurrence keeps its position; later compatible edges only
/// strengthen its kind and widen its scope.
pub fn dedup_dependencies(edges: impl IntoIterator<Item = ModuleDependency>) -> Vec<ModuleDependency> {
    let mut merged: Vec<ModuleDependency> = Vec::new();

    for edge in edges {
        let class = edge.kind.compat_class();
        match merged
            .iter_mut()
            .find(|m| m.to == edge.to && m.kind.compat_class() == class)
        {
            Some(existing) => {
                existing.kind = existing.kind.strongest(edge.kind);
                existing.scope = existing.scope.union(&edge.scope);
            }
            None => merged.push(edge),
        }
    }

    merged
}
