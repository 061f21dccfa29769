//! `mpbundle explain` command

use anyhow::Result;

use crate::cli::ExplainArgs;
use mpbundle::ops::{load_workspace, resolve_app};
use mpbundle::GlobalContext;

pub fn execute(args: ExplainArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = load_workspace(ctx)?;
    let resolved = resolve_app(&ws)?;
    let entries = &resolved.resolution.entries;

    let entry = entries.lookup(&args.entry).ok_or_else(|| {
        anyhow::anyhow!(
            "entry `{}` is not part of the build\n\
             help: Run `mpbundle entries` to see all entries",
            args.entry
        )
    })?;

    println!("{} ({}, scope {})", entry.id, entry.kind, entries.scope(entry.scope));

    let chains = entries.reference_chains(&entry.id);
    if chains.iter().all(|chain| chain.len() <= 1) {
        println!("  declared in app.json");
        return Ok(());
    }

    for chain in chains {
        let path: Vec<&str> = chain.iter().map(|id| id.as_str()).collect();
        println!("  {}", path.join(" -> "));
    }

    Ok(())
}
