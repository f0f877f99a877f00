//! crld CLI - strategy-averaged learning dynamics
//!
//! - `solve`: averaged models, values, and prediction errors of one policy
//! - `learn`: iterate the learning dynamics, optionally exporting the trajectory

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crld")]
#[command(version, about = "Strategy-averaged learning dynamics for independent agents", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the averaged dynamics of a joint policy
    Solve(crld::cli::commands::solve::SolveArgs),

    /// Run the learning dynamics from an initial policy
    Learn(Box<crld::cli::commands::learn::LearnArgs>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    crld::cli::init_logging(cli.verbose);

    match cli.command {
        Commands::Solve(args) => crld::cli::commands::solve::execute(args),
        Commands::Learn(args) => crld::cli::commands::learn::execute(*args),
    }
}
