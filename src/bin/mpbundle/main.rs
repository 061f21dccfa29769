//! mpbundle CLI - entry resolution and bundle partitioning for mini programs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mpbundle::core::ConfigError;
use mpbundle::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast::<ConfigError>() {
            Ok(config_error) => eprintln!("{:?}", miette::Report::new(config_error)),
            Err(e) => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("mpbundle=debug")
    } else {
        EnvFilter::new("mpbundle=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Entries(args) => commands::entries::execute(args, &ctx),
        Commands::Explain(args) => commands::explain::execute(args, &ctx),
        Commands::Plan(args) => commands::plan::execute(args, &ctx),
        Commands::Assets(args) => commands::assets::execute(args, &ctx),
        Commands::Assemble(args) => commands::assemble::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
