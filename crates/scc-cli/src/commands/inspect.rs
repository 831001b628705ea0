use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use scc_pack::load_frame;
use scc_rank::load_map;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Frame file written by `scc pack`.
    #[arg(long, conflicts_with = "mapping", required_unless_present = "mapping")]
    pub frame: Option<PathBuf>,
    /// Mapping directory written by `scc fit-rank`.
    #[arg(long)]
    pub mapping: Option<PathBuf>,
}

#[derive(Serialize)]
struct FrameSummary {
    molecules: usize,
    couplings: usize,
    max_coupling: usize,
    node_width: usize,
    edge_width: usize,
    empty_molecules: usize,
}

#[derive(Serialize)]
struct MappingSummary {
    fold: u32,
    types: Vec<TypeSummary>,
}

#[derive(Serialize)]
struct TypeSummary {
    coupling_type: String,
    observations: usize,
    distinct: usize,
    min: Option<f64>,
    max: Option<f64>,
}

/// Prints a JSON summary of a frame or a mapping directory.
pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let json = if let Some(path) = &args.frame {
        let frame = load_frame(path)?;
        let counts: Vec<usize> = (0..frame.len()).map(|row| frame.num_coupling(row)).collect();
        serde_json::to_string_pretty(&FrameSummary {
            molecules: frame.len(),
            couplings: frame.total_couplings(),
            max_coupling: counts.iter().copied().max().unwrap_or(0),
            node_width: frame.layout().node.width(),
            edge_width: frame.layout().edge.width(),
            empty_molecules: counts.iter().filter(|count| **count == 0).count(),
        })?
    } else if let Some(dir) = &args.mapping {
        let map = load_map(dir, None)?;
        serde_json::to_string_pretty(&MappingSummary {
            fold: map.fold(),
            types: map
                .mappings()
                .map(|mapping| TypeSummary {
                    coupling_type: mapping.coupling_type().to_string(),
                    observations: mapping.observations(),
                    distinct: mapping.len(),
                    min: mapping.values().first().copied(),
                    max: mapping.values().last().copied(),
                })
                .collect(),
        })?
    } else {
        return Err("pass --frame or --mapping".into());
    };
    println!("{json}");
    Ok(())
}
