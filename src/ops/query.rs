//! Read-only workspace queries: module order, provider ranking and class usage.

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::analysis::{source::module_sources, SourceFile};
use crate::core::Workspace;
use crate::resolver::{find_cycles, rank_providers, sort, sort_strict, SortOrder};

/// Module names in dependency order.
///
/// With `strict`, a cyclic graph is an error instead of a best-effort order.
pub fn module_order(ws: &Workspace, order: SortOrder, strict: bool) -> Result<Vec<String>> {
    let graph = ws.dependency_graph();
    if strict {
        return sort_strict(&graph, order).map_err(|e| anyhow!("{e}\nhelp: {}", e.help()));
    }

    for cycle in find_cycles(&graph) {
        tracing::debug!("dependency cycle: {}", cycle.join(" -> "));
    }
    Ok(sort(&graph, order))
}

/// One ranked provider of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderEntry {
    pub module: String,
    pub grade: i32,
    pub implementations: Vec<String>,
}

/// Every compatible provider of `capability` on the named target, best first.
///
/// Aggregate modules have no sources and never provide anything.
pub fn providers(ws: &Workspace, capability: &str, target: &str) -> Result<Vec<ProviderEntry>> {
    let target = ws.target(target)?;
    let scope = ws.modules().filter(|m| !m.is_aggregate());

    Ok(rank_providers(scope, capability, target)
        .into_iter()
        .map(|ranked| ProviderEntry {
            module: ranked.candidate.name().to_string(),
            grade: ranked.grade,
            implementations: ranked.candidate.implementations(capability).to_vec(),
        })
        .collect())
}

/// Names of modules with at least one source file referencing `class`.
pub fn uses(ws: &Workspace, class: &str) -> Result<Vec<String>> {
    let mut result = Vec::new();
    for module in ws.modules().filter(|m| !m.is_aggregate()) {
        for path in module_sources(module)? {
            if SourceFile::from_path(&path)?.references(class) {
                tracing::debug!("`{}` referenced in {}", class, path.display());
                result.push(module.name().to_string());
                break;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{java, WorkspaceFixture};

    #[test]
    fn test_module_order() {
        let fixture = WorkspaceFixture::new("demo")
            .module("app", "[dependencies]\nui = \"implementation\"\n")
            .module("ui", "[dependencies]\ncore = \"api\"\n")
            .module("core", "")
            .write();
        let ws = fixture.workspace();

        let ascending = module_order(&ws, SortOrder::Ascending, false).unwrap();
        let pos = |n: &str| ascending.iter().position(|m| m == n).unwrap();
        assert!(pos("core") < pos("ui"));
        assert!(pos("ui") < pos("app"));

        let mut descending = module_order(&ws, SortOrder::Descending, false).unwrap();
        descending.reverse();
        assert_eq!(descending, ascending);
    }

    #[test]
    fn test_strict_order_rejects_cycles() {
        let fixture = WorkspaceFixture::new("demo")
            .module("a", "[dependencies]\nb = \"implementation\"\n")
            .module("b", "[dependencies]\na = \"implementation\"\n")
            .write();
        let ws = fixture.workspace();

        assert_eq!(module_order(&ws, SortOrder::Ascending, false).unwrap().len(), 3);
        let err = module_order(&ws, SortOrder::Ascending, true).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_providers_ranked_best_first() {
        let fixture = WorkspaceFixture::new("demo")
            .module(
                "audio-any",
                "[capabilities.provides]\n\"spi.Audio\" = [\"any.Audio\"]\n",
            )
            .module(
                "audio-web",
                "[capabilities.provides]\n\"spi.Audio\" = [\"web.Audio\"]\n[compatibility]\ntags = [\"web-transpiled\"]\n",
            )
            .write();
        let ws = fixture.workspace();

        let web = providers(&ws, "spi.Audio", "web").unwrap();
        let ranked: Vec<_> = web.iter().map(|p| (p.module.as_str(), p.grade)).collect();
        assert_eq!(ranked, vec![("audio-web", 3), ("audio-any", 1)]);
        assert_eq!(web[0].implementations, vec!["web.Audio"]);

        let desktop = providers(&ws, "spi.Audio", "desktop").unwrap();
        assert_eq!(desktop.len(), 1);

        assert!(providers(&ws, "spi.Audio", "mars").is_err());
    }

    #[test]
    fn test_uses_finds_referencing_modules() {
        let fixture = WorkspaceFixture::new("demo")
            .module("core", "")
            .module("app", "")
            .module("docs", "")
            .file(
                "core/src/com/acme/core/Engine.java",
                &java::plain("com.acme.core", "Engine"),
            )
            .file(
                "app/src/com/acme/app/Main.java",
                "package com.acme.app;\n\nimport com.acme.core.Engine;\n\nclass Main { Engine e; }\n",
            )
            .file(
                "docs/src/com/acme/docs/Notes.java",
                "package com.acme.docs;\n\n// Engine is documented elsewhere\nclass Notes { String s = \"Engine\"; }\n",
            )
            .write();
        let ws = fixture.workspace();

        assert_eq!(uses(&ws, "com.acme.core.Engine").unwrap(), vec!["app", "core"]);
    }
}
