//! `shipyard uses` command

use anyhow::Result;

use crate::cli::UsesArgs;
use shipyard::ops::uses;
use shipyard::util::GlobalContext;

pub fn execute(args: UsesArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let ws = ctx.workspace()?;

    for module in uses(&ws, &args.class)? {
        println!("{}", module);
    }
    Ok(())
}
