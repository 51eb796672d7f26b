//! Deployment targets and module compatibility requirements.
//!
//! A [`Target`] is an unordered set of platform tags plus optional
//! environment qualifiers. Targets are never compared by identity: two
//! targets relate through tag-set overlap, and a module relates to a target
//! through its [`TargetRequirement`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Runs on the native managed runtime.
pub const NATIVE_RUNTIME: &str = "native-runtime";

/// Transpiled to run in a browser.
pub const WEB_TRANSPILED: &str = "web-transpiled";

/// Compiled ahead of time (no runtime reflection).
pub const AOT_COMPILED: &str = "aot-compiled";

/// A requested deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name as used on the command line and in output paths
    name: String,

    /// Platform tags
    tags: BTreeSet<String>,

    /// Environment qualifiers (e.g. `browser`, `debug`)
    qualifiers: BTreeSet<String>,
}

impl Target {
    /// Create a target with the given tags and no qualifiers.
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            qualifiers: BTreeSet::new(),
        }
    }

    /// Add environment qualifiers.
    pub fn with_qualifiers<I, S>(mut self, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.qualifiers.extend(qualifiers.into_iter().map(Into::into));
        self
    }

    /// The built-in targets used when a project declares none.
    pub fn builtin() -> Vec<Target> {
        vec![
            Target::new("desktop", [NATIVE_RUNTIME]),
            Target::new("web", [WEB_TRANSPILED]),
            Target::new("ios", [AOT_COMPILED]),
        ]
    }

    /// Get the target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the platform tags.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Get the environment qualifiers.
    pub fn qualifiers(&self) -> &BTreeSet<String> {
        &self.qualifiers
    }

    /// Check if this target carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check whether two targets share at least one platform tag.
    pub fn overlaps(&self, other: &Target) -> bool {
        !self.tags.is_disjoint(&other.tags)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// `[targets.<name>]` table in Shipyard.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub tags: Vec<String>,
    pub qualifiers: Vec<String>,
}

impl TargetSpec {
    /// Build the named target.
    pub fn to_target(&self, name: &str) -> Target {
        Target::new(name, self.tags.iter().cloned()).with_qualifiers(self.qualifiers.iter().cloned())
    }
}

/// Convert the declared target table into targets, falling back to the
/// built-in set when nothing is declared.
pub fn targets_from_specs(specs: &BTreeMap<String, TargetSpec>) -> Vec<Target> {
    if specs.is_empty() {
        return Target::builtin();
    }
    specs
        .iter()
        .map(|(name, spec)| spec.to_target(name))
        .collect()
}

/// What a module needs from a target in order to run on it.
///
/// An empty requirement is generic: compatible with every target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetRequirement {
    /// Platform tags the target must carry
    pub tags: BTreeSet<String>,

    /// Qualifiers the target must carry
    pub qualifiers: BTreeSet<String>,
}

impl TargetRequirement {
    /// A requirement on the given tags.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TargetRequirement {
            tags: tags.into_iter().map(Into::into).collect(),
            qualifiers: BTreeSet::new(),
        }
    }

    /// Check if the requirement is generic.
    pub fn is_generic(&self) -> bool {
        self.tags.is_empty() && self.qualifiers.is_empty()
    }

    /// Every required tag and qualifier must be present on the target.
    pub fn is_satisfied_by(&self, target: &Target) -> bool {
        self.tags.is_subset(&target.tags) && self.qualifiers.is_subset(&target.qualifiers)
    }

    /// Grade how specifically this requirement matches a target.
    ///
    /// Higher is better. A generic module grades 1; each matched tag adds 2
    /// and each matched qualifier adds 1. Callers are expected to filter on
    /// [`is_satisfied_by`](Self::is_satisfied_by) first.
    pub fn grade(&self, target: &Target) -> i32 {
        let tags = self.tags.intersection(&target.tags).count() as i32;
        let qualifiers = self.qualifiers.intersection(&target.qualifiers).count() as i32;
        1 + 2 * tags + qualifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_requirement_matches_everything() {
        let req = TargetRequirement::default();
        for target in Target::builtin() {
            assert!(req.is_satisfied_by(&target));
            assert_eq!(req.grade(&target), 1);
        }
    }

    #[test]
    fn test_specific_requirement() {
        let web = Target::new("web", [WEB_TRANSPILED]);
        let desktop = Target::new("desktop", [NATIVE_RUNTIME]);
        let req = TargetRequirement::tags([WEB_TRANSPILED]);

        assert!(req.is_satisfied_by(&web));
        assert!(!req.is_satisfied_by(&desktop));
        assert_eq!(req.grade(&web), 3);
    }

    #[test]
    fn test_qualifiers_must_be_present() {
        let plain = Target::new("web", [WEB_TRANSPILED]);
        let browser = plain.clone().with_qualifiers(["browser"]);
        let mut req = TargetRequirement::tags([WEB_TRANSPILED]);
        req.qualifiers.insert("browser".to_string());

        assert!(!req.is_satisfied_by(&plain));
        assert!(req.is_satisfied_by(&browser));
        assert_eq!(req.grade(&browser), 4);
    }

    #[test]
    fn test_overlap() {
        let a = Target::new("a", [WEB_TRANSPILED, AOT_COMPILED]);
        let b = Target::new("b", [AOT_COMPILED]);
        let c = Target::new("c", [NATIVE_RUNTIME]);
        assert!(a.overlaps(&b));
        assert!(!b.overlaps(&c));
    }

    #[test]
    fn test_targets_from_empty_specs() {
        let targets = targets_from_specs(&BTreeMap::new());
        let names: Vec<_> = targets.iter().map(Target::name).collect();
        assert_eq!(names, vec!["desktop", "web", "ios"]);
    }
}
