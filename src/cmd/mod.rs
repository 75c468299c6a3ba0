mod replay;
mod status;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

pub use replay::ReplayArgs;
pub use status::StatusArgs;

#[derive(Parser)]
#[command(name = "sql-replayer")]
#[command(version)]
#[command(
    about = "Replay large SQL dump files against a database, resuming from the last checkpoint after a restart",
    long_about = None
)]
pub struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(global = true, short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a SQL dump statement by statement, checkpointing progress
    Replay(ReplayArgs),

    /// Show how far a previous replay of a dump got
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Replay(args) => replay::run(args),
        Commands::Status(args) => status::run(args),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "sql-replayer",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
