//! jellyfetch CLI
//!
//! Downloads movies, series and collections from a Jellyfin server into a
//! local media library, with NFO metadata, artwork and external subtitles.

use clap::Parser;
use jellyfetch::cli::{
    args::{Cli, Commands},
    commands::{fetch, logout},
};
use jellyfetch::models::config::load_config;
use jellyfetch::preflight::Preflight;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Fetch(args) => {
            if !cli.skip_preflight {
                let dest = fetch::resolve_dest(&args, &load_config());
                run_preflight_checks(&args.server, &dest).await?;
            }
            fetch::fetch(args).await?;
        }

        Commands::Logout { server } => {
            logout::logout(&server).await?;
        }
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("jellyfetch=debug")
    } else {
        EnvFilter::new("jellyfetch=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
async fn run_preflight_checks(server: &str, dest: &Path) -> anyhow::Result<()> {
    use colored::Colorize;

    println!("{}", "Running preflight checks...".bold());
    println!();

    let report = Preflight::run(server, dest).await;
    report.print();

    println!();

    if !report.passed() {
        anyhow::bail!("Preflight checks failed. Fix the issues above and try again.");
    }

    Ok(())
}
