//! Shipyard CLI - regenerates build artifacts of multi-target modular projects

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shipyard::util::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("shipyard=debug")
    } else {
        EnvFilter::new("shipyard=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color, cli.json));

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &shell),
        Commands::Clean(args) => commands::clean::execute(args, &shell),
        Commands::Order(args) => commands::order::execute(args),
        Commands::Providers(args) => commands::providers::execute(args, &shell),
        Commands::Uses(args) => commands::uses::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
