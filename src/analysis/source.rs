//! Lightweight static analysis of Java-dialect source files.
//!
//! A [`SourceFile`] answers questions about one text: its package, the fully
//! qualified name behind a short class name, and whether it references a class.
//! A [`SourceAnalyzer`] extracts capability lookups and reflective array
//! creations from a module's sources.
//!
//! Every pattern is matched through [`CodePattern`], so declarations and calls
//! inside comments or string literals are ignored. Scanning never fails: a
//! missing package or import falls through to the documented fallback.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, OnceLock};

use anyhow::{Context, Result};
use regex::Regex;

use crate::analysis::scanner::CodePattern;
use crate::core::Module;
use crate::util::fs::{glob_files, read_to_string};

/// Default capability lookup: `Capabilities.get(Foo.class)`, also `lookup` and `all`.
pub const DEFAULT_CAPABILITY_PATTERN: &str =
    r"\bCapabilities\s*\.\s*(?:get|lookup|all)\s*\(\s*([A-Za-z_][\w.]*?)\s*\.\s*class\b";

/// Default reflective array creation: `Array.newInstance(Foo.class, n)`.
pub const DEFAULT_ARRAY_PATTERN: &str =
    r"\bArray\s*\.\s*newInstance\s*\(\s*([A-Za-z_][\w.]*?)\s*\.\s*class\b";

const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

static PACKAGE_PATTERN: LazyLock<CodePattern> = LazyLock::new(|| {
    CodePattern::new(r"\bpackage\s+([A-Za-z_][\w.]*)\s*;", 1).expect("package pattern must compile")
});

static IMPORT_PATTERN: LazyLock<CodePattern> = LazyLock::new(|| {
    CodePattern::new(r"\bimport\s+(?:static\s+)?([A-Za-z_][\w.]*\*?)\s*;", 1)
        .expect("import pattern must compile")
});

static DEFAULT_CAPABILITY: LazyLock<CodePattern> = LazyLock::new(|| {
    CodePattern::new(DEFAULT_CAPABILITY_PATTERN, 1).expect("capability pattern must compile")
});

static DEFAULT_ARRAY: LazyLock<CodePattern> = LazyLock::new(|| {
    CodePattern::new(DEFAULT_ARRAY_PATTERN, 1).expect("array pattern must compile")
});

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    /// `import a.b.C;`
    Single(String),
    /// `import a.b.*;`, holding `a.b`
    Wildcard(String),
}

impl Import {
    fn parse(declared: &str) -> Self {
        match declared.strip_suffix(".*") {
            Some(package) => Import::Wildcard(package.to_string()),
            None => Import::Single(declared.to_string()),
        }
    }
}

/// One source text with lazily extracted declarations.
#[derive(Debug)]
pub struct SourceFile {
    path: Option<PathBuf>,
    text: String,
    package: OnceLock<Option<String>>,
    imports: OnceLock<Vec<Import>>,
}

impl SourceFile {
    /// Wrap an in-memory text.
    pub fn new(text: impl Into<String>) -> Self {
        SourceFile {
            path: None,
            text: text.into(),
            package: OnceLock::new(),
            imports: OnceLock::new(),
        }
    }

    /// Read a file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = read_to_string(path)?;
        Ok(SourceFile {
            path: Some(path.to_path_buf()),
            ..SourceFile::new(text)
        })
    }

    /// Path the text was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The declared package, if any.
    pub fn package(&self) -> Option<&str> {
        self.package
            .get_or_init(|| PACKAGE_PATTERN.first(&self.text).map(str::to_string))
            .as_deref()
    }

    /// Import declarations in source order.
    pub fn imports(&self) -> &[Import] {
        self.imports.get_or_init(|| {
            IMPORT_PATTERN
                .matches(&self.text)
                .map(Import::parse)
                .collect()
        })
    }

    /// Resolve a class name as written in this file to a qualified name.
    ///
    /// Qualified names are returned unchanged. Otherwise the first single
    /// import ending in `.name` wins, then the file's own package. Without
    /// either, the name is in the default package and returned as is.
    pub fn resolve_class_name(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_string();
        }

        let suffix = format!(".{name}");
        let imported = self.imports().iter().find_map(|import| match import {
            Import::Single(qualified) if qualified.ends_with(&suffix) => Some(qualified),
            _ => None,
        });
        if let Some(qualified) = imported {
            return qualified.clone();
        }

        match self.package() {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }

    /// Whether this file references a fully qualified class.
    ///
    /// True when an import names the class, when the class is visible by
    /// package (same package or wildcard import) and its simple name appears
    /// in code, or when the qualified name itself appears in code.
    pub fn references(&self, class: &str) -> bool {
        let (package, simple) = match class.rsplit_once('.') {
            Some((package, simple)) => (Some(package), simple),
            None => (None, class),
        };

        let imports = self.imports();
        if imports.iter().any(|i| matches!(i, Import::Single(q) if q == class)) {
            return true;
        }

        let visible = self.package() == package
            || package.is_some_and(|p| {
                imports.iter().any(|i| matches!(i, Import::Wildcard(w) if w == p))
            });
        if visible && occurs_in_code(&self.text, simple) {
            return true;
        }

        package.is_some() && occurs_in_code(&self.text, class)
    }
}

/// Whether `word` occurs as a whole token in a code region.
fn occurs_in_code(text: &str, word: &str) -> bool {
    let pattern = format!(r"(?:^|[^\w.])({})\b", regex::escape(word));
    Regex::new(&pattern).is_ok_and(|regex| CodePattern::from_regex(regex, 1).first(text).is_some())
}

/// Capability and array usages found in sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUsage {
    /// Fully qualified capability interfaces looked up at runtime
    pub capabilities: BTreeSet<String>,
    /// Fully qualified element types of reflectively created arrays
    pub array_types: BTreeSet<String>,
}

impl SourceUsage {
    /// Fold another file's usages into this one.
    pub fn merge(&mut self, other: SourceUsage) {
        self.capabilities.extend(other.capabilities);
        self.array_types.extend(other.array_types);
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty() && self.array_types.is_empty()
    }
}

/// Extracts usages from sources with configurable call patterns.
#[derive(Debug, Clone)]
pub struct SourceAnalyzer {
    capability: CodePattern,
    array: CodePattern,
}

impl Default for SourceAnalyzer {
    fn default() -> Self {
        SourceAnalyzer {
            capability: DEFAULT_CAPABILITY.clone(),
            array: DEFAULT_ARRAY.clone(),
        }
    }
}

impl SourceAnalyzer {
    /// Build an analyzer, overriding the default patterns where given.
    ///
    /// Capture group 1 of each pattern must be the type argument.
    pub fn with_patterns(capability: Option<&str>, array: Option<&str>) -> Result<Self> {
        let mut analyzer = SourceAnalyzer::default();
        if let Some(pattern) = capability {
            analyzer.capability = CodePattern::new(pattern, 1)
                .with_context(|| format!("invalid capability pattern: {pattern}"))?;
        }
        if let Some(pattern) = array {
            analyzer.array = CodePattern::new(pattern, 1)
                .with_context(|| format!("invalid array pattern: {pattern}"))?;
        }
        Ok(analyzer)
    }

    /// Capability interfaces looked up in `source`, resolved, in first-use order.
    pub fn capability_usages(&self, source: &SourceFile) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.capability
            .matches(source.text())
            .map(|name| source.resolve_class_name(name))
            .filter(|class| seen.insert(class.clone()))
            .collect()
    }

    /// Element types of arrays created reflectively in `source`.
    ///
    /// Primitive element types are excluded.
    pub fn array_types(&self, source: &SourceFile) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.array
            .matches(source.text())
            .filter(|name| !PRIMITIVE_TYPES.contains(name))
            .map(|name| source.resolve_class_name(name))
            .filter(|class| seen.insert(class.clone()))
            .collect()
    }

    /// Both usages of one file.
    pub fn analyze(&self, source: &SourceFile) -> SourceUsage {
        SourceUsage {
            capabilities: self.capability_usages(source).into_iter().collect(),
            array_types: self.array_types(source).into_iter().collect(),
        }
    }

    /// Usages across all of a module's source files.
    pub fn analyze_module(&self, module: &Module) -> Result<SourceUsage> {
        let mut usage = SourceUsage::default();
        for path in module_sources(module)? {
            let source = SourceFile::from_path(&path)?;
            usage.merge(self.analyze(&source));
        }
        tracing::debug!(
            module = module.name(),
            capabilities = usage.capabilities.len(),
            arrays = usage.array_types.len(),
            "analyzed sources"
        );
        Ok(usage)
    }
}

/// Source files of a module, sorted.
pub fn module_sources(module: &Module) -> Result<Vec<PathBuf>> {
    glob_files(module.root(), module.source_patterns())
        .with_context(|| format!("failed to list sources of module `{}`", module.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_through_import() {
        let source = SourceFile::new(
            "package com.acme.app;\n\nimport com.acme.Foo;\n\nclass App { Foo foo; }\n",
        );
        assert_eq!(source.resolve_class_name("Foo"), "com.acme.Foo");
    }

    #[test]
    fn test_resolve_falls_back_to_package() {
        let source = SourceFile::new("package com.acme.sub;\nimport com.other.Baz;\n");
        assert_eq!(source.resolve_class_name("Bar"), "com.acme.sub.Bar");
    }

    #[test]
    fn test_resolve_default_package() {
        let source = SourceFile::new("class Plain {}");
        assert_eq!(source.package(), None);
        assert_eq!(source.resolve_class_name("Bar"), "Bar");
    }

    #[test]
    fn test_qualified_names_are_unchanged() {
        let source = SourceFile::new("package com.acme;\nimport org.x.Foo;\n");
        assert_eq!(source.resolve_class_name("org.y.Foo"), "org.y.Foo");
    }

    #[test]
    fn test_commented_declarations_are_ignored() {
        let source = SourceFile::new(
            "// package com.wrong;\n/* import com.wrong.Foo; */\npackage com.right;\nString s = \"import com.str.Foo;\";\n",
        );
        assert_eq!(source.package(), Some("com.right"));
        assert!(source.imports().is_empty());
        assert_eq!(source.resolve_class_name("Foo"), "com.right.Foo");
    }

    #[test]
    fn test_import_suffix_must_match_whole_name() {
        let source = SourceFile::new("package p;\nimport com.acme.BigFoo;\n");
        assert_eq!(source.resolve_class_name("Foo"), "p.Foo");
    }

    #[test]
    fn test_static_and_wildcard_imports() {
        let source = SourceFile::new("import static com.acme.Util.helper;\nimport com.acme.spi.*;\n");
        assert_eq!(
            source.imports(),
            &[
                Import::Single("com.acme.Util.helper".into()),
                Import::Wildcard("com.acme.spi".into()),
            ]
        );
        // Wildcards never resolve a short name.
        assert_eq!(source.resolve_class_name("Audio"), "Audio");
    }

    #[test]
    fn test_capability_usages() {
        let source = SourceFile::new(
            r#"package com.acme.app;
import com.acme.spi.Audio;

class App {
    void run() {
        Audio a = Capabilities.get(Audio.class);
        Renderer r = Capabilities.lookup(Renderer.class);
        // Capabilities.get(Commented.class);
        log("Capabilities.get(Quoted.class)");
        Capabilities.all( com.other.Net.class );
        Capabilities.get(Audio.class);
    }
}
"#,
        );
        let analyzer = SourceAnalyzer::default();
        assert_eq!(
            analyzer.capability_usages(&source),
            vec!["com.acme.spi.Audio", "com.acme.app.Renderer", "com.other.Net"]
        );
    }

    #[test]
    fn test_array_types_skip_primitives() {
        let source = SourceFile::new(
            "package com.acme;\nObject a = Array.newInstance(Item.class, 4);\nObject b = Array.newInstance(int.class, 2);\n",
        );
        let analyzer = SourceAnalyzer::default();
        assert_eq!(analyzer.array_types(&source), vec!["com.acme.Item"]);
    }

    #[test]
    fn test_custom_patterns() {
        let analyzer = SourceAnalyzer::with_patterns(Some(r"Services\.load\((\w+)\.class\)"), None).unwrap();
        let source = SourceFile::new("package a;\nServices.load(Clock.class);\nCapabilities.get(Audio.class);\n");
        assert_eq!(analyzer.capability_usages(&source), vec!["a.Clock"]);

        assert!(SourceAnalyzer::with_patterns(Some("(unclosed"), None).is_err());
    }

    #[test]
    fn test_references() {
        let importer = SourceFile::new("package app;\nimport com.acme.Foo;\n");
        assert!(importer.references("com.acme.Foo"));
        assert!(!importer.references("com.acme.Bar"));

        let same_package = SourceFile::new("package com.acme;\nclass X { Bar bar; }\n");
        assert!(same_package.references("com.acme.Bar"));
        assert!(!same_package.references("com.acme.Baz"));

        let wildcard = SourceFile::new("package app;\nimport com.acme.*;\nclass X { Baz b; }\n");
        assert!(wildcard.references("com.acme.Baz"));

        let qualified = SourceFile::new("package app;\nclass X { com.acme.Qux q; }\n");
        assert!(qualified.references("com.acme.Qux"));

        let commented = SourceFile::new("package app;\n// com.acme.Qux\nclass X {}\n");
        assert!(!commented.references("com.acme.Qux"));
    }

    #[test]
    fn test_analyze_module_reads_matching_sources() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/com/acme");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("A.java"),
            "package com.acme;\nclass A { Object o = Capabilities.get(Audio.class); }\n",
        )
        .unwrap();
        std::fs::write(
            src.join("B.java"),
            "package com.acme;\nclass B { Object o = Array.newInstance(B.class, 1); }\n",
        )
        .unwrap();
        std::fs::write(src.join("notes.txt"), "Capabilities.get(Ignored.class)").unwrap();

        let module = Module::new(
            "core",
            crate::core::Coordinates {
                group: "com.acme".into(),
                artifact: "core".into(),
                version: semver::Version::new(1, 0, 0),
            },
            tmp.path(),
        );
        let usage = SourceAnalyzer::default().analyze_module(&module).unwrap();
        assert_eq!(usage.capabilities.iter().collect::<Vec<_>>(), vec!["com.acme.Audio"]);
        assert_eq!(usage.array_types.iter().collect::<Vec<_>>(), vec!["com.acme.B"]);
    }
}
