use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rf_tools::cli::{Cli, Commands};
use rf_tools::{combine, norm, peak};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start = std::time::Instant::now();
    let cli = Cli::parse();
    match cli.command {
        Commands::Norm(args) => {
            norm::run(&args)?;
        }
        Commands::Peakcall(args) => {
            peak::run(&args)?;
        }
        Commands::Combine(args) => {
            combine::run(&args)?;
        }
    }
    tracing::info!(elapsed = ?start.elapsed(), "done");
    Ok(())
}
