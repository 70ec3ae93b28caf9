//! Elastico CLI - drift simulation and file processing for elastic delay buffers.

mod commands;
mod drift;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "elastico")]
#[command(author, version, about = "Elastic delay buffer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a producer and consumer on drifting clocks with a test tone
    Simulate(commands::simulate::SimulateArgs),

    /// Pass a WAV file through a drifting clock bridge
    Process(commands::process::ProcessArgs),

    /// Print, write or validate settings files
    Settings(commands::settings::SettingsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Settings(args) => commands::settings::run(args),
    }
}
