//! sweeprun CLI entry point.
//!
//! Binary name: `sweeprun`
//!
//! Parses CLI arguments, initializes tracing, then dispatches to the
//! manifest runner or the dry-run planner.

mod cli;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,sweeprun_core=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { manifest, cores } => {
            let summary = cli::run::run_manifest(&manifest, cores, cli.json).await?;
            if summary.any_failed {
                anyhow::bail!(
                    "{} of {} jobs failed, see log above",
                    summary.failed,
                    summary.total
                );
            }
        }

        Commands::Plan { manifest } => {
            cli::plan::plan_manifest(&manifest, cli.json)?;
        }

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "sweeprun", &mut std::io::stdout());
        }
    }

    Ok(())
}
