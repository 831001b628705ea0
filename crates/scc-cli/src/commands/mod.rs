pub mod fit_rank;
pub mod inspect;
pub mod pack;
pub mod run_fold;

use std::error::Error;
use std::path::PathBuf;

use scc_run::RunConfig;

/// Loads the run configuration, applying a fold override.
pub fn load_config(path: &PathBuf, fold: Option<u32>) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = RunConfig::load(path)?;
    if let Some(fold) = fold {
        config.fold = fold;
        config.validate()?;
    }
    Ok(config)
}
