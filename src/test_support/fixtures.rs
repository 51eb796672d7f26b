//! Throw-away projects for tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::{Workspace, MODULE_MANIFEST, PROJECT_MANIFEST};

/// Builder for a project written to a temporary directory.
///
/// ```rust,ignore
/// let fixture = WorkspaceFixture::new("demo")
///     .module("core", "")
///     .module("app", "[dependencies]\ncore = \"api\"\n")
///     .write();
/// let ws = fixture.workspace();
/// ```
#[derive(Debug)]
pub struct WorkspaceFixture {
    name: String,
    group: String,
    /// Extra Shipyard.toml content, appended after `[project]`
    project_extra: String,
    /// (module dir, Module.toml content)
    modules: Vec<(PathBuf, String)>,
    /// (path relative to the project root, content)
    files: Vec<(PathBuf, String)>,
    dir: Option<TempDir>,
}

impl WorkspaceFixture {
    /// A project with group `com.example` and no modules.
    pub fn new(name: impl Into<String>) -> Self {
        WorkspaceFixture {
            name: name.into(),
            group: "com.example".to_string(),
            project_extra: String::new(),
            modules: Vec::new(),
            files: Vec::new(),
            dir: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Append raw TOML (usually `[targets.*]` tables) to Shipyard.toml.
    pub fn project(mut self, toml: impl Into<String>) -> Self {
        self.project_extra.push_str(&toml.into());
        self
    }

    /// Add a module directory with its Module.toml content.
    pub fn module(mut self, dir: impl Into<PathBuf>, toml: impl Into<String>) -> Self {
        self.modules.push((dir.into(), toml.into()));
        self
    }

    /// Add any file, relative to the project root.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Write everything to a fresh temporary directory.
    pub fn write(mut self) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path();

        let project = format!(
            "[project]\nname = \"{}\"\ngroup = \"{}\"\nversion = \"1.0.0\"\n\n{}",
            self.name, self.group, self.project_extra
        );
        write_file(&root.join(PROJECT_MANIFEST), &project);

        for (module_dir, toml) in &self.modules {
            write_file(&root.join(module_dir).join(MODULE_MANIFEST), toml);
        }
        for (path, content) in &self.files {
            write_file(&root.join(path), content);
        }

        self.dir = Some(dir);
        self
    }

    /// Project root; panics before [`write`](Self::write).
    pub fn root(&self) -> &Path {
        self.dir.as_ref().expect("fixture not written").path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root().join(PROJECT_MANIFEST)
    }

    /// Load the written project.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.manifest_path()).expect("load fixture workspace")
    }

    /// Read a file relative to the project root.
    pub fn read(&self, path: impl AsRef<Path>) -> String {
        std::fs::read_to_string(self.root().join(path)).expect("read fixture file")
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    std::fs::write(path, content).expect("write fixture file");
}

/// Java source templates.
pub mod java {
    /// A class that looks up each capability through `Capabilities.get`.
    pub fn capability_user(package: &str, class: &str, capabilities: &[&str]) -> String {
        let imports: String = capabilities
            .iter()
            .filter(|c| c.contains('.'))
            .map(|c| format!("import {c};\n"))
            .collect();
        let lookups: String = capabilities
            .iter()
            .map(|c| {
                let simple = c.rsplit('.').next().unwrap_or(c);
                format!("        Capabilities.get({simple}.class);\n")
            })
            .collect();
        format!(
            "package {package};\n\n{imports}\npublic class {class} {{\n    void start() {{\n{lookups}    }}\n}}\n"
        )
    }

    /// A plain class with no capability lookups.
    pub fn plain(package: &str, class: &str) -> String {
        format!("package {package};\n\npublic class {class} {{}}\n")
    }
}
