//! Per-target service registry.
//!
//! For each capability a module requires, the registry lists constructor
//! references of every compatible provider, best first. A module with
//! resources also registers its generated resource bundle.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::{Module, Target};
use crate::generate::{Artifact, GenerateError, Transaction, GENERATED_HEADER};
use crate::resolver::rank_providers;

pub const REGISTRY_FILE: &str = "services.registry";

/// Capability under which resource bundles are registered.
pub const RESOURCE_BUNDLE_CAPABILITY: &str = "shipyard.resources.ResourceBundle";

/// Location of a module's registry for one target.
pub fn registry_path(dir: &Path, target: &str) -> PathBuf {
    dir.join(target).join(REGISTRY_FILE)
}

/// One capability and its providers' constructors, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub capability: String,
    pub constructors: Vec<String>,
}

/// Resolved providers of one module for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistry {
    target: String,
    entries: Vec<RegistryEntry>,
    /// Required capabilities without a compatible provider
    missing: Vec<String>,
}

impl ServiceRegistry {
    /// Resolve every required capability against `scope` for `target`.
    ///
    /// `bundle` is the resource bundle class, appended as a synthetic
    /// provider when present.
    pub fn resolve(
        scope: &[&Module],
        requires: &BTreeSet<String>,
        target: &Target,
        bundle: Option<&str>,
    ) -> Self {
        let mut entries = Vec::new();
        let mut missing = Vec::new();

        for capability in requires {
            let mut constructors: Vec<String> = Vec::new();
            for ranked in rank_providers(scope.iter().copied(), capability, target) {
                for class in ranked.candidate.implementations(capability) {
                    let ctor = format!("{class}::new");
                    if !constructors.contains(&ctor) {
                        constructors.push(ctor);
                    }
                }
            }

            if constructors.is_empty() {
                missing.push(capability.clone());
            } else {
                entries.push(RegistryEntry {
                    capability: capability.clone(),
                    constructors,
                });
            }
        }

        if let Some(bundle) = bundle {
            entries.push(RegistryEntry {
                capability: RESOURCE_BUNDLE_CAPABILITY.to_string(),
                constructors: vec![format!("{bundle}::new")],
            });
        }

        ServiceRegistry {
            target: target.name().to_string(),
            entries,
            missing,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Capabilities that resolved to no provider.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Get the constructors bound to a capability.
    pub fn constructors(&self, capability: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.capability == capability)
            .map(|e| e.constructors.as_slice())
    }

    pub fn render(&self) -> String {
        let mut out = format!("{GENERATED_HEADER}\n# target: {}\n", self.target);
        for entry in &self.entries {
            out.push_str(&format!("{} = {}\n", entry.capability, entry.constructors.join(", ")));
        }
        out
    }
}

/// Registry file of one module for one target.
///
/// `None` means the module needs no registry and any stale file is removed.
#[derive(Debug, Clone)]
pub struct RegistryArtifact {
    pub path: PathBuf,
    pub registry: Option<ServiceRegistry>,
}

impl Artifact for RegistryArtifact {
    fn name(&self) -> &'static str {
        "service registry"
    }

    fn plan(&self, tx: &Transaction<'_, '_>) -> Result<(), GenerateError> {
        match &self.registry {
            Some(registry) => tx.write(&self.path, registry.render()),
            None => tx.delete(&self.path),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{TargetRequirement, NATIVE_RUNTIME, WEB_TRANSPILED};
    use crate::core::Coordinates;

    fn module(name: &str) -> Module {
        Module::new(
            name,
            Coordinates {
                group: "com.acme".into(),
                artifact: name.into(),
                version: semver::Version::new(1, 0, 0),
            },
            format!("/ws/{name}"),
        )
    }

    fn requires(caps: &[&str]) -> BTreeSet<String> {
        caps.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_providers_ranked_per_target() {
        let generic = module("audio-any").with_provided("spi.Audio", "any.Audio");
        let web = module("audio-web")
            .with_provided("spi.Audio", "web.Audio")
            .with_compatibility(TargetRequirement::tags([WEB_TRANSPILED]));
        let scope = [&generic, &web];
        let caps = requires(&["spi.Audio", "spi.Missing"]);

        let on_web = ServiceRegistry::resolve(&scope, &caps, &Target::new("web", [WEB_TRANSPILED]), None);
        assert_eq!(
            on_web.constructors("spi.Audio").unwrap(),
            ["web.Audio::new", "any.Audio::new"]
        );
        assert_eq!(on_web.missing(), ["spi.Missing"]);

        let on_desktop =
            ServiceRegistry::resolve(&scope, &caps, &Target::new("desktop", [NATIVE_RUNTIME]), None);
        assert_eq!(on_desktop.constructors("spi.Audio").unwrap(), ["any.Audio::new"]);
    }

    #[test]
    fn test_resource_bundle_is_appended() {
        let registry = ServiceRegistry::resolve(
            &[],
            &BTreeSet::new(),
            &Target::new("web", [WEB_TRANSPILED]),
            Some("com.acme.generated.CoreResources"),
        );
        assert_eq!(
            registry.render(),
            format!(
                "{GENERATED_HEADER}\n# target: web\nshipyard.resources.ResourceBundle = com.acme.generated.CoreResources::new\n"
            )
        );
    }

    #[test]
    fn test_registry_path() {
        assert_eq!(
            registry_path(Path::new("/m/build/generated"), "ios"),
            PathBuf::from("/m/build/generated/ios/services.registry")
        );
    }
}
