use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use scc_core::RunProvenance;
use scc_pack::read_coupling_table;
use scc_rank::{save_map, GaussRankMap};
use scc_run::{stable_hash_string, FoldAssignment};

use super::load_config;

#[derive(Args, Debug)]
pub struct FitRankArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Fold to fit, overriding the configuration.
    #[arg(long)]
    pub fold: Option<u32>,
    /// Mapping directory to write.
    #[arg(long)]
    pub out: PathBuf,
}

/// Fits the fold's rank tables on its training molecules and saves them.
pub fn run(args: &FitRankArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config, args.fold)?;
    let couplings = read_coupling_table(&config.data.train_couplings, true)?;
    let split = FoldAssignment::load(&config.data.folds)?.split(config.fold, config.num_folds)?;
    let (train, _) = couplings.partition(&split.train);
    let map = GaussRankMap::fit(train.records(), config.fold)?;
    let provenance = RunProvenance {
        config_hash: stable_hash_string(&config)?,
        fold: Some(config.fold),
        seed: config.seed.master_seed,
        ..RunProvenance::default()
    };
    let manifest = save_map(&map, &args.out, &provenance)?;
    for entry in &manifest.tables {
        println!(
            "{}\t{} values\t{}",
            entry.coupling_type, entry.observations, entry.file
        );
    }
    Ok(())
}
