use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    fit_rank::{self, FitRankArgs},
    inspect::{self, InspectArgs},
    pack::{self, PackArgs},
    run_fold::{self, RunFoldArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "scc", about = "Scalar-coupling GaussRank and packing pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a fold's GaussRank tables and write them to a mapping directory.
    FitRank(FitRankArgs),
    /// Pack one split of a fold into a frame file.
    Pack(PackArgs),
    /// Run a fold end to end with the identity model.
    RunFold(RunFoldArgs),
    /// Summarise a frame file or a mapping directory.
    Inspect(InspectArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::FitRank(args) => fit_rank::run(&args),
        Command::Pack(args) => pack::run(&args),
        Command::RunFold(args) => run_fold::run(&args),
        Command::Inspect(args) => inspect::run(&args),
    }
}
