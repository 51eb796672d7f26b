//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use shipyard::generate::ManifestFlavor;
use shipyard::util::shell::ColorChoice;

/// Shipyard - regenerate manifests, service registries and platform stubs
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring of status output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto, value_name = "WHEN")]
    pub color: ColorChoice,

    /// Emit machine-readable JSON events on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Regenerate every artifact of the project
    Generate(GenerateArgs),

    /// Delete every generated artifact
    Clean(CleanArgs),

    /// Print modules in dependency order
    Order(OrderArgs),

    /// Rank the providers of a capability for a target
    Providers(ProvidersArgs),

    /// List modules whose sources reference a class
    Uses(UsesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Only generate registries for these targets
    #[arg(long, value_name = "NAME")]
    pub target: Vec<String>,

    /// Manifest flavor
    #[arg(long, value_enum)]
    pub flavor: Option<ManifestFlavor>,

    /// Fail on dependency cycles
    #[arg(long)]
    pub strict: bool,

    /// Number of source analysis threads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not run after-generate hooks
    #[arg(long)]
    pub no_hooks: bool,
}

#[derive(Args)]
pub struct CleanArgs {}

#[derive(Args)]
pub struct OrderArgs {
    /// Dependents before dependencies
    #[arg(long)]
    pub reverse: bool,

    /// Fail on dependency cycles
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ProvidersArgs {
    /// Fully qualified capability name
    pub capability: String,

    /// Target to rank for
    #[arg(long, value_name = "NAME")]
    pub target: String,
}

#[derive(Args)]
pub struct UsesArgs {
    /// Fully qualified class name
    pub class: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
