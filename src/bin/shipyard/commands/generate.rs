//! `shipyard generate` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::GenerateArgs;
use shipyard::ops::generate::{generate, GenerateOptions};
use shipyard::util::{GlobalContext, Shell};

pub fn execute(args: GenerateArgs, shell: &Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let ws = ctx.workspace()?;

    // Load configuration (global + project); CLI flags override it
    let config = ctx.config(ws.root());

    let opts = GenerateOptions {
        targets: args.target,
        flavor: args.flavor,
        strict: args.strict,
        jobs: args.jobs,
        no_hooks: args.no_hooks,
    };

    generate(&ws, &config, &opts, shell)?;
    Ok(())
}
