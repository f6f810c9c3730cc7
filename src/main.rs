//! Skywatch - headless orbital tracking host
//!
//! Runs the tracking engine over a catalog without a renderer, for batch
//! reports and catalog diagnostics.

use anyhow::Result;
use clap::{Parser, Subcommand};

use skywatch::analysis::{run_inspect, run_simulation, InspectArgs, SimulateArgs};

#[derive(Parser, Debug)]
#[command(name = "skywatch", version, about = "Orbital tracking engine host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine for a number of ticks and write a JSON report
    Simulate(SimulateArgs),
    /// Search the catalog and print element summaries
    Inspect(InspectArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => run_simulation(args),
        Command::Inspect(args) => run_inspect(args),
    }
}
