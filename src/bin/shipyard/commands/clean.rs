//! `shipyard clean` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::CleanArgs;
use shipyard::ops::clean;
use shipyard::util::{GlobalContext, Shell};

pub fn execute(_args: CleanArgs, shell: &Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let ws = ctx.workspace()?;
    let config = ctx.config(ws.root());

    clean(&ws, &config, shell)?;
    Ok(())
}
