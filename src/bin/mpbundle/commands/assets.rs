//! `mpbundle assets` command

use anyhow::Result;

use crate::cli::AssetsArgs;
use crate::commands::report;
use mpbundle::ops::{asset_patterns, collect_assets, load_workspace, resolve_app};
use mpbundle::GlobalContext;

pub fn execute(args: AssetsArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = load_workspace(ctx)?;
    let resolved = resolve_app(&ws)?;
    let patterns = asset_patterns(
        &ws,
        &resolved.resolution.entries,
        &resolved.resolution.tab_bar_assets,
    );
    let mut diagnostics = resolved.diagnostics().to_vec();
    let assets = collect_assets(&ws, &patterns, &mut diagnostics)?;

    if args.json {
        let json = serde_json::json!({
            "patterns": patterns,
            "assets": assets,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("include:");
        for pattern in patterns.include.iter().chain(&patterns.package_include) {
            println!("  {}", pattern);
        }
        println!("ignore:");
        for pattern in &patterns.ignore {
            println!("  {}", pattern);
        }
        println!("assets:");
        for asset in &assets {
            println!("  {}", asset.output);
        }
    }

    report(&diagnostics, ctx);
    Ok(())
}
