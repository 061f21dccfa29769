//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// mpbundle - entry resolution and bundle partitioning for mini programs
#[derive(Parser)]
#[command(name = "mpbundle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every page and component reachable from app.json
    Entries(EntriesArgs),

    /// Explain why an entry is part of the build
    Explain(ExplainArgs),

    /// Show the shared bundle plan for a usage fact file
    Plan(PlanArgs),

    /// Show asset patterns and the files they match
    Assets(AssetsArgs),

    /// Assemble generated bundles into the final output
    Assemble(AssembleArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct EntriesArgs {
    /// Print the entry set as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Entry id or output name
    pub entry: String,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Module usage fact file written by the host bundler
    #[arg(long)]
    pub usage: PathBuf,

    /// Print the partition rules instead of the plan
    #[arg(long)]
    pub rules: bool,
}

#[derive(Args)]
pub struct AssetsArgs {
    /// Print the patterns and files as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AssembleArgs {
    /// Module usage fact file written by the host bundler
    #[arg(long)]
    pub usage: PathBuf,

    /// Directory holding the generated bundles
    #[arg(long)]
    pub input: PathBuf,

    /// Output directory (overrides `[app] output_dir`)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Do not copy assets
    #[arg(long)]
    pub no_assets: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
