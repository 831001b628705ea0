#![deny(missing_docs)]
#![doc = "Cross-validation fold runner: splits labelled molecules, stacks prior predictions, hands packed batches to a model and reconstructs, scores and writes its predictions."]

/// YAML run configuration.
pub mod config;
/// Fold assignment.
pub mod folds;
/// Canonical JSON hashing.
pub mod hash;
/// Run manifests.
pub mod manifest;
/// Validation metric.
pub mod metrics;
/// Model seam.
pub mod model;
/// Prediction files.
pub mod output;
/// End-to-end fold run.
pub mod pipeline;
/// Prediction reconstruction.
pub mod reconstruct;
/// Prior-stage predictions.
pub mod stacking;

pub use config::{DataConfig, LayoutConfig, OutputConfig, RunConfig, SeedPolicy, TargetScaling};
pub use folds::{FoldAssignment, FoldSplit};
pub use hash::stable_hash_string;
pub use manifest::{RowCounts, RunManifest, RunOutputs};
pub use metrics::{LmaeReport, TypeScore};
pub use model::{CouplingModel, IdentityModel};
pub use output::OutputNames;
pub use pipeline::{prepare_fold, run_fold, FoldInputs, FoldReport, PreparedFold};
pub use reconstruct::{collect_predictions, reconstruct, PredictionCollector, PredictionRow};
pub use stacking::{PriorPredictions, StackOutcome};
