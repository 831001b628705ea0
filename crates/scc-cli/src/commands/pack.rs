use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use log::info;
use scc_pack::{export_frame_csv, save_frame};
use scc_run::{prepare_fold, FoldInputs};

use super::load_config;

/// Split of a fold.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    /// Training molecules, pseudo-labelled test molecules included.
    Train,
    /// Held-out fold.
    Valid,
    /// Unlabelled molecules.
    Test,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Fold to pack, overriding the configuration.
    #[arg(long)]
    pub fold: Option<u32>,
    /// Split to write.
    #[arg(long, value_enum, default_value_t = Split::Train)]
    pub split: Split,
    /// Frame file (bincode; `.gz` compresses).
    #[arg(long)]
    pub out: PathBuf,
    /// Also export the frame as a flat CSV table.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

/// Packs one split of the fold and writes it.
pub fn run(args: &PackArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config, args.fold)?;
    let inputs = FoldInputs::load(&config)?;
    let prepared = prepare_fold(&config, &inputs)?;
    let frame = match args.split {
        Split::Train => &prepared.train,
        Split::Valid => &prepared.valid,
        Split::Test => &prepared.test,
    };
    save_frame(frame, &args.out)?;
    if let Some(path) = &args.csv {
        export_frame_csv(frame, path)?;
        info!("exported {} rows to {}", frame.len(), path.display());
    }
    println!(
        "{:?}: {} molecules, {} couplings, {} warnings",
        args.split,
        frame.len(),
        frame.total_couplings(),
        prepared.warnings.len()
    );
    Ok(())
}
