//! `mpbundle plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use crate::commands::report;
use mpbundle::ops::{export_app_rules, load_workspace, plan_app, resolve_app};
use mpbundle::GlobalContext;

pub fn execute(args: PlanArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = load_workspace(ctx)?;
    let resolved = resolve_app(&ws)?;
    let entries = &resolved.resolution.entries;
    let mut diagnostics = resolved.diagnostics().to_vec();

    if args.rules {
        let export = export_app_rules(&ws, entries)?;
        println!("{}", serde_json::to_string_pretty(&export)?);
    } else {
        let usage = ctx.cwd().join(&args.usage);
        let plan = plan_app(&ws, entries, &usage, &mut diagnostics)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    report(&diagnostics, ctx);
    Ok(())
}
