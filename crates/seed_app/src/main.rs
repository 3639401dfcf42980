mod config;
mod host;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use seed_core::JobStatus;
use seed_logging::LogDestination;

use crate::host::Host;

#[derive(Debug, Parser)]
#[command(name = "seed_app", about = "Seeds the local food catalog in the background")]
struct Cli {
    /// RON configuration file.
    #[arg(long, global = true, default_value = "seed.ron")]
    config: PathBuf,
    #[arg(long, global = true, default_value = "seed.log")]
    log_file: PathBuf,
    /// Also log debug output to the terminal.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the status left behind by previous runs.
    Status,
    /// Queue the job and serve execution windows until it settles.
    Run,
    /// Run the job immediately in the foreground.
    Foreground,
    /// Cancel a queued or running job.
    Cancel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (destination, level) = if cli.verbose {
        (LogDestination::Both(cli.log_file), LevelFilter::Debug)
    } else {
        (LogDestination::File(cli.log_file), LevelFilter::Info)
    };
    seed_logging::initialize(destination, level);

    let config = config::load(&cli.config);
    let host = Host::build(config)?;
    let status = match cli.command {
        Command::Status => host.status(),
        Command::Cancel => host.cancel(),
        Command::Foreground => host.foreground().await,
        Command::Run => host.run().await,
    };

    if let JobStatus::Failed { error } = status {
        anyhow::bail!("seeding job failed: {error}");
    }
    Ok(())
}
