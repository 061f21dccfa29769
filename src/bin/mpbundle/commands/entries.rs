//! `mpbundle entries` command

use anyhow::Result;

use crate::cli::EntriesArgs;
use crate::commands::report;
use mpbundle::core::EntryRef;
use mpbundle::ops::{load_workspace, resolve_app};
use mpbundle::GlobalContext;

pub fn execute(args: EntriesArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = load_workspace(ctx)?;
    let resolved = resolve_app(&ws)?;
    let entries = &resolved.resolution.entries;

    if args.json {
        let scopes: Vec<_> = entries.scopes().map(|(_, scope)| scope).collect();
        let list: Vec<&EntryRef> = entries.iter().collect();
        let json = serde_json::json!({
            "scopes": scopes,
            "entries": list,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (id, scope) in entries.scopes() {
            println!("{}", scope);
            for entry in entries.entries_in(id) {
                let kind = entry.kind.to_string();
                if entry.output == entry.id.as_str() {
                    println!("  {:<10} {}", kind, entry.id);
                } else {
                    println!("  {:<10} {} -> {}", kind, entry.id, entry.output);
                }
            }
        }
    }

    report(resolved.diagnostics(), ctx);
    Ok(())
}
