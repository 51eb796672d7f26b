//! Embedded resource bundle descriptor.
//!
//! Every file below a module's resource directory gets an accessor name
//! derived from its relative path. The descriptor is deleted rather than
//! written empty when a module has no resources.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::Coordinates;
use crate::generate::{Artifact, GenerateError, Transaction, GENERATED_HEADER};

pub const RESOURCE_INDEX_FILE: &str = "resources.index";

/// A resource and its accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Path relative to the resource directory, `/`-separated
    pub path: String,
    pub accessor: String,
}

/// All resources of one module, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    entries: Vec<ResourceEntry>,
}

impl ResourceIndex {
    /// List the files below `dir`. A missing directory yields an empty index.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Ok(ResourceIndex::default());
        }

        let mut paths = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to list resources in {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let parts: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            paths.push(parts.join("/"));
        }

        Ok(ResourceIndex::from_paths(paths))
    }

    /// Build an index from relative paths, assigning unique accessors.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        paths.sort();
        paths.dedup();

        let mut used: HashSet<String> = HashSet::new();
        let entries = paths
            .into_iter()
            .map(|path| {
                let base = accessor_name(&path);
                let mut accessor = base.clone();
                let mut n = 2;
                while !used.insert(accessor.clone()) {
                    accessor = format!("{base}_{n}");
                    n += 1;
                }
                ResourceEntry { path, accessor }
            })
            .collect();

        ResourceIndex { entries }
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = format!("{GENERATED_HEADER}\n");
        for entry in &self.entries {
            out.push_str(&format!("{} = {}\n", entry.path, entry.accessor));
        }
        out
    }
}

/// camelCase accessor for a resource path: `img/app-logo.png` -> `imgAppLogoPng`.
pub fn accessor_name(path: &str) -> String {
    let mut name = String::new();
    for word in path.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        if name.is_empty() {
            name.push(first.to_ascii_lowercase());
        } else {
            name.push(first.to_ascii_uppercase());
        }
        name.extend(chars);
    }

    if name.is_empty() {
        return "resource".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Class of the generated resource bundle: `<group>.generated.<Artifact>Resources`.
pub fn bundle_class(coordinates: &Coordinates) -> String {
    let pascal: String = coordinates
        .artifact
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if coordinates.group.is_empty() {
        format!("generated.{pascal}Resources")
    } else {
        format!("{}.generated.{pascal}Resources", coordinates.group)
    }
}

/// The resource index file of one module.
#[derive(Debug, Clone)]
pub struct ResourceIndexArtifact {
    pub path: PathBuf,
    pub index: ResourceIndex,
}

impl Artifact for ResourceIndexArtifact {
    fn name(&self) -> &'static str {
        "resource index"
    }

    fn plan(&self, tx: &Transaction<'_, '_>) -> Result<(), GenerateError> {
        if self.index.is_empty() {
            tx.delete(&self.path);
        } else {
            tx.write(&self.path, self.index.render());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{emit, FileSynthesizer};
    use crate::test_support::capture_shell;
    use tempfile::TempDir;

    #[test]
    fn test_accessor_names() {
        assert_eq!(accessor_name("img/app-logo.png"), "imgAppLogoPng");
        assert_eq!(accessor_name("Readme.TXT"), "readmeTXT");
        assert_eq!(accessor_name("3d/model.obj"), "_3dModelObj");
        assert_eq!(accessor_name("---"), "resource");
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let index = ResourceIndex::from_paths(["a_b.txt", "a-b.txt", "a.b.txt"]);
        let accessors: Vec<_> = index.entries().iter().map(|e| e.accessor.as_str()).collect();
        assert_eq!(accessors, vec!["aBTxt", "aBTxt_2", "aBTxt_3"]);
        assert_eq!(index.entries()[0].path, "a-b.txt");
    }

    #[test]
    fn test_bundle_class() {
        let coords = Coordinates {
            group: "com.acme".into(),
            artifact: "demo-core".into(),
            version: semver::Version::new(1, 0, 0),
        };
        assert_eq!(bundle_class(&coords), "com.acme.generated.DemoCoreResources");
    }

    #[test]
    fn test_scan_lists_nested_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("resources");
        std::fs::create_dir_all(dir.join("img")).unwrap();
        std::fs::write(dir.join("img/logo.png"), "png").unwrap();
        std::fs::write(dir.join("strings.txt"), "hi").unwrap();
        std::fs::write(dir.join(".DS_Store"), "").unwrap();

        let index = ResourceIndex::scan(&dir).unwrap();
        assert_eq!(
            index.render(),
            format!("{GENERATED_HEADER}\nimg/logo.png = imgLogoPng\nstrings.txt = stringsTxt\n")
        );

        assert!(ResourceIndex::scan(&tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index_deletes_descriptor() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(RESOURCE_INDEX_FILE);
        std::fs::write(&path, "stale").unwrap();

        let shell = capture_shell();
        let synth = FileSynthesizer::new(&shell);
        let artifact = ResourceIndexArtifact {
            path: path.clone(),
            index: ResourceIndex::default(),
        };
        assert_eq!(emit(&synth, &artifact).unwrap().deleted, 1);
        assert!(!path.exists());
    }
}
