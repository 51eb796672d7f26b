//! `shipyard order` command

use anyhow::Result;

use crate::cli::OrderArgs;
use shipyard::ops::module_order;
use shipyard::resolver::SortOrder;
use shipyard::util::GlobalContext;

pub fn execute(args: OrderArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let ws = ctx.workspace()?;
    let config = ctx.config(ws.root());

    let order = if args.reverse {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    let strict = args.strict || config.strict_cycles();

    for name in module_order(&ws, order, strict)? {
        println!("{}", name);
    }
    Ok(())
}
