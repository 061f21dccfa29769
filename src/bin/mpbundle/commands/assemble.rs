//! `mpbundle assemble` command

use std::time::Instant;

use anyhow::Result;

use crate::cli::AssembleArgs;
use crate::commands::report;
use mpbundle::ops::{assemble_app, load_workspace, BuildSession, PipelineOptions};
use mpbundle::GlobalContext;

pub fn execute(args: AssembleArgs, ctx: &GlobalContext) -> Result<()> {
    let start = Instant::now();

    let mut ws = load_workspace(ctx)?;
    if let Some(out) = args.out {
        ws = ws.with_output_dir(ctx.cwd().join(out));
    }

    let options = PipelineOptions {
        usage: ctx.cwd().join(&args.usage),
        input: ctx.cwd().join(&args.input),
        copy_assets: !args.no_assets,
        progress: !ctx.is_verbose(),
    };

    let session = BuildSession::new();
    let Some(outcome) = assemble_app(&ws, &session, &options)? else {
        return Ok(());
    };

    report(&outcome.diagnostics, ctx);
    eprintln!(
        "    Finished {} bundle(s), {} asset(s) in {:.2}s",
        outcome.bundles.len(),
        outcome.assets.written + outcome.assets.unchanged,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
