#![deny(missing_docs)]
#![doc = "GaussRank target normalisation: per fold and per coupling type, raw targets are mapped through their empirical quantile onto standard-normal scores, and model outputs are mapped back."]

/// Persisted mapping directories.
pub mod persist;
/// Inverse standard normal CDF.
pub mod probit;

mod mapping;
mod transform;

pub use mapping::RankMapping;
pub use persist::{load_map, save_map, MappingEntry, MappingManifest};
pub use probit::normal_quantile;
pub use transform::GaussRankMap;
