//! Implementation of `shipyard generate`.
//!
//! One pass over the workspace: analyze every module's sources in parallel,
//! then, in dependency order, plan each module's artifacts into nested
//! transactions under a single outer transaction. Nothing touches the disk
//! until the outer transaction commits; hooks run only after that commit.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::analysis::{SourceAnalyzer, SourceUsage};
use crate::core::{Module, Target, Workspace};
use crate::generate::array_factory::{ArrayFactoryArtifact, ARRAY_FACTORY_FILE};
use crate::generate::manifest::ManifestArtifact;
use crate::generate::registry::{registry_path, RegistryArtifact};
use crate::generate::resources::{bundle_class, ResourceIndexArtifact, RESOURCE_INDEX_FILE};
use crate::generate::{
    emit, ArrayFactory, CommitReport, FileSynthesizer, ManifestFlavor, ResolvedManifest,
    ResourceIndex, ServiceRegistry,
};
use crate::ops::query::module_order;
use crate::resolver::SortOrder;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};
use crate::util::Config;

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Targets to generate registries for (empty = all)
    pub targets: Vec<String>,

    /// Manifest flavor, overriding the config
    pub flavor: Option<ManifestFlavor>,

    /// Fail on dependency cycles
    pub strict: bool,

    /// Number of analysis threads
    pub jobs: Option<usize>,

    /// Skip `after-generate` hooks
    pub no_hooks: bool,
}

/// A required capability with no compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingProvider {
    pub module: String,
    pub target: String,
    pub capability: String,
}

/// Outcome of a generation pass.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    /// Modules that received artifacts
    pub modules: usize,

    /// File changes of the outer commit
    pub files: CommitReport,

    pub missing: Vec<MissingProvider>,
}

/// Generate every artifact of the workspace.
pub fn generate(
    ws: &Workspace,
    config: &Config,
    opts: &GenerateOptions,
    shell: &Arc<Shell>,
) -> Result<GenerateReport> {
    let flavor = opts.flavor.unwrap_or_else(|| config.flavor());
    let strict = opts.strict || config.strict_cycles();
    let jobs = opts.jobs.or(config.generate.jobs);
    let targets = ws.select_targets(&opts.targets)?;

    let order = module_order(ws, SortOrder::Ascending, strict)?;
    let analyzer = SourceAnalyzer::with_patterns(
        config.generate.capability_pattern.as_deref(),
        config.generate.array_pattern.as_deref(),
    )?;
    let usages = analyze_sources(ws, &analyzer, jobs, shell)?;

    let mut span = shell.span(
        Status::Generating,
        format!("{} modules for {}", order.len(), target_list(&targets)),
    );

    let output_dir = config.output_dir();
    let plan = ModulePlan {
        ws,
        order: &order,
        output_dir: &output_dir,
        flavor,
        targets: &targets,
        scope: ws.modules().filter(|m| !m.is_aggregate()).collect(),
    };

    let synthesizer = FileSynthesizer::new(shell).with_display_root(ws.root());
    let outer = synthesizer.open();
    let mut report = GenerateReport::default();
    let empty = SourceUsage::default();

    for name in &order {
        let Some(module) = ws.module(name) else {
            continue;
        };
        let usage = usages.get(name).unwrap_or(&empty);
        report
            .missing
            .extend(plan.emit_module(&synthesizer, module, usage)?);
        report.modules += 1;
        span.maybe_print_start();
    }

    report.files = outer.commit()?;

    for missing in &report.missing {
        shell.warn(format!(
            "no provider of `{}` for module `{}` on target `{}`",
            missing.capability, missing.module, missing.target
        ));
    }

    if !opts.no_hooks {
        run_hooks(&config.hooks.after_generate, ws.root(), shell)?;
    }

    let files = report.files;
    span.finish_with_message(format!(
        "{} modules ({} created, {} updated, {} deleted, {} unchanged)",
        report.modules, files.created, files.updated, files.deleted, files.unchanged
    ));
    Ok(report)
}

/// Shared inputs of every module's artifacts.
struct ModulePlan<'a> {
    ws: &'a Workspace,
    order: &'a [String],
    output_dir: &'a Path,
    flavor: ManifestFlavor,
    targets: &'a [Target],
    /// Provider search scope
    scope: Vec<&'a Module>,
}

impl ModulePlan<'_> {
    /// Plan all artifacts of one module; returns unresolved capabilities.
    fn emit_module(
        &self,
        synthesizer: &FileSynthesizer<'_>,
        module: &Module,
        usage: &SourceUsage,
    ) -> Result<Vec<MissingProvider>> {
        let out = module.root().join(self.output_dir);
        let requires: BTreeSet<String> = module
            .requires()
            .iter()
            .chain(&usage.capabilities)
            .cloned()
            .collect();
        tracing::debug!(module = module.name(), requires = requires.len(), "planning module");

        let manifest = ResolvedManifest::resolve(self.ws, module, &requires, self.ws.targets(), self.order);
        emit(
            synthesizer,
            &ManifestArtifact {
                dir: out.clone(),
                flavor: self.flavor,
                manifest,
            },
        )?;

        if module.is_aggregate() {
            return Ok(Vec::new());
        }

        let index = ResourceIndex::scan(&module.resource_dir())
            .with_context(|| format!("failed to index resources of module `{}`", module.name()))?;
        let bundle = (!index.is_empty()).then(|| bundle_class(module.coordinates()));

        let mut missing = Vec::new();
        for target in self.targets {
            let registry = if requires.is_empty() && bundle.is_none() {
                None
            } else {
                let registry = ServiceRegistry::resolve(&self.scope, &requires, target, bundle.as_deref());
                missing.extend(registry.missing().iter().map(|capability| MissingProvider {
                    module: module.name().to_string(),
                    target: target.name().to_string(),
                    capability: capability.clone(),
                }));
                Some(registry)
            };
            emit(
                synthesizer,
                &RegistryArtifact {
                    path: registry_path(&out, target.name()),
                    registry,
                },
            )?;
        }

        emit(
            synthesizer,
            &ArrayFactoryArtifact {
                path: out.join(ARRAY_FACTORY_FILE),
                factory: ArrayFactory::new(usage.array_types.iter().cloned()),
            },
        )?;
        emit(
            synthesizer,
            &ResourceIndexArtifact {
                path: out.join(RESOURCE_INDEX_FILE),
                index,
            },
        )?;

        Ok(missing)
    }
}

/// Analyze the sources of every non-aggregate module in parallel.
fn analyze_sources(
    ws: &Workspace,
    analyzer: &SourceAnalyzer,
    jobs: Option<usize>,
    shell: &Arc<Shell>,
) -> Result<BTreeMap<String, SourceUsage>> {
    let modules: Vec<&Module> = ws.modules().filter(|m| !m.is_aggregate()).collect();
    shell.status(Status::Analyzing, format!("sources of {} modules", modules.len()));
    let progress = Mutex::new(shell.progress(modules.len() as u64, "Analyzing"));

    let analyze = || {
        modules
            .par_iter()
            .map(|module| {
                let usage = analyzer.analyze_module(module)?;
                progress
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .inc(1);
                Ok((module.name().to_string(), usage))
            })
            .collect::<Result<BTreeMap<_, _>>>()
    };

    let usages = match jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to create analysis thread pool")?
            .install(analyze),
        None => analyze(),
    };

    progress
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .finish();
    usages
}

/// Run `after-generate` hooks in the project root, stopping at the first failure.
fn run_hooks(hooks: &[Vec<String>], root: &Path, shell: &Shell) -> Result<()> {
    for argv in hooks {
        let Some(process) = ProcessBuilder::from_argv(argv) else {
            tracing::warn!("ignoring empty after-generate hook");
            continue;
        };
        let process = process.cwd(root);
        shell.status(Status::Running, process.display_command());

        let output = process
            .exec_and_check()
            .context("after-generate hook failed")?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            tracing::info!("{}", line);
        }
    }
    Ok(())
}

fn target_list(targets: &[Target]) -> String {
    targets
        .iter()
        .map(Target::name)
        .collect::<Vec<_>>()
        .join(", ")
}
