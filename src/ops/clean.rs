//! Implementation of `shipyard clean`.

use std::sync::Arc;

use anyhow::Result;

use crate::core::Workspace;
use crate::generate::array_factory::ARRAY_FACTORY_FILE;
use crate::generate::registry::{registry_path, REGISTRY_FILE};
use crate::generate::resources::RESOURCE_INDEX_FILE;
use crate::generate::{CommitReport, FileSynthesizer, ManifestFlavor};
use crate::util::fs::{glob_files, remove_empty_dirs};
use crate::util::shell::{Shell, Status};
use crate::util::Config;

/// Delete every generated artifact of every module, for all flavors and targets.
///
/// All deletes go through one transaction; emptied output directories are
/// removed afterwards. Registries left under targets no longer declared in
/// Shipyard.toml are removed too.
pub fn clean(ws: &Workspace, config: &Config, shell: &Arc<Shell>) -> Result<CommitReport> {
    let output_dir = config.output_dir();
    shell.status(Status::Cleaning, format!("{} modules", ws.len()));

    let synthesizer = FileSynthesizer::new(shell).with_display_root(ws.root());
    let tx = synthesizer.open();
    let mut registry_dirs = Vec::new();
    for module in ws.modules() {
        let out = module.root().join(&output_dir);
        for flavor in ManifestFlavor::ALL {
            tx.delete(out.join(flavor.file_name()));
        }
        for target in ws.targets() {
            tx.delete(registry_path(&out, target.name()));
            registry_dirs.push((out.join(target.name()), module.root()));
        }
        for stale in glob_files(&out, &[format!("*/{REGISTRY_FILE}")])? {
            let Some(dir) = stale.parent() else {
                continue;
            };
            if ws.targets().iter().any(|t| dir == out.join(t.name())) {
                continue;
            }
            tracing::debug!("removing registry of undeclared target: {}", stale.display());
            registry_dirs.push((dir.to_path_buf(), module.root()));
            tx.delete(stale);
        }
        tx.delete(out.join(ARRAY_FACTORY_FILE));
        tx.delete(out.join(RESOURCE_INDEX_FILE));
    }
    let report = tx.commit()?;

    for (dir, stop) in &registry_dirs {
        remove_empty_dirs(dir, stop)?;
    }
    for module in ws.modules() {
        remove_empty_dirs(&module.root().join(&output_dir), module.root())?;
    }

    shell.status(Status::Finished, format!("{} files removed", report.deleted));
    Ok(report)
}
