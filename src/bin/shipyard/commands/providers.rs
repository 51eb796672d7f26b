//! `shipyard providers` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::ProvidersArgs;
use shipyard::ops::providers;
use shipyard::util::{GlobalContext, Shell};

pub fn execute(args: ProvidersArgs, shell: &Arc<Shell>) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let ws = ctx.workspace()?;

    let ranked = providers(&ws, &args.capability, &args.target)?;

    if shell.is_json() {
        let event = serde_json::json!({
            "reason": "providers",
            "capability": args.capability,
            "target": args.target,
            "providers": ranked,
        });
        shell.json_event(&event);
        return Ok(());
    }

    if ranked.is_empty() {
        shell.warn(format!(
            "no provider of `{}` is compatible with target `{}`",
            args.capability, args.target
        ));
        return Ok(());
    }

    for provider in &ranked {
        println!(
            "{:>4}  {}  ({})",
            provider.grade,
            provider.module,
            provider.implementations.join(", ")
        );
    }
    Ok(())
}
