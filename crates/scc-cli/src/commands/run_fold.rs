use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use scc_run::{run_fold, FoldInputs, IdentityModel};

use super::load_config;

#[derive(Args, Debug)]
pub struct RunFoldArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Fold to run, overriding the configuration.
    #[arg(long)]
    pub fold: Option<u32>,
    /// Output directory, overriding the configuration.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Runs the fold with the identity model, which echoes packed targets.
pub fn run(args: &RunFoldArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.config, args.fold)?;
    if let Some(out) = &args.out {
        config.output.directory = out.clone();
    }
    let inputs = FoldInputs::load(&config)?;
    let mut model = IdentityModel::new(config.num_output, config.target);
    let report = run_fold(&config, &inputs, &mut model)?;
    println!("{}", report.lmae.summary_line());
    println!("cv: {}", report.cv_path.display());
    println!("sub: {}", report.sub_path.display());
    println!("manifest: {}", report.manifest_path.display());
    Ok(())
}
