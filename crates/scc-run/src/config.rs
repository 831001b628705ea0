use std::fs;
use std::path::{Path, PathBuf};

use scc_core::{ErrorInfo, SccError};
use scc_pack::{FeatureLayout, PackLayout};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters of one cross-validation fold run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Input tables.
    pub data: DataConfig,
    /// Fold to hold out for validation.
    #[serde(default)]
    pub fold: u32,
    /// Number of folds in the assignment table.
    #[serde(default = "default_num_folds")]
    pub num_folds: u32,
    /// Molecules per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Training epochs handed to the model.
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Declared node and edge block shapes.
    pub layout: LayoutConfig,
    /// Space the model predicts in.
    #[serde(default)]
    pub target: TargetScaling,
    /// Outputs per coupling slot: 1 (constant) or 5 (constant plus contributions).
    #[serde(default = "default_num_output")]
    pub num_output: usize,
    /// Loss name recorded in output file names.
    #[serde(default = "default_loss")]
    pub loss: String,
    /// Append prior-labelled test molecules to the training frame.
    #[serde(default)]
    pub pseudo_label: bool,
    /// Master seed for epoch shuffles.
    #[serde(default)]
    pub seed: SeedPolicy,
    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_num_folds() -> u32 {
    5
}

fn default_batch_size() -> usize {
    32
}

fn default_epochs() -> u32 {
    1
}

fn default_num_output() -> usize {
    1
}

fn default_loss() -> String {
    "lmae".to_string()
}

/// Paths of the input tables. `.gz` paths are read through gzip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Labelled coupling table.
    pub train_couplings: PathBuf,
    /// Unlabelled coupling table.
    pub test_couplings: PathBuf,
    /// Node table covering train and test molecules.
    pub nodes: PathBuf,
    /// Edge table covering train and test molecules.
    pub edges: PathBuf,
    /// `molecule_name, fold` assignment of the labelled molecules.
    pub folds: PathBuf,
    /// Previous-stage predictions keyed by pair id.
    #[serde(default)]
    pub prior_predictions: Option<PathBuf>,
}

/// Node and edge block shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Maximum atoms per molecule.
    pub max_nodes: usize,
    /// Features per atom.
    pub node_stride: usize,
    /// Maximum edges per molecule.
    pub max_edges: usize,
    /// Features per edge.
    pub edge_stride: usize,
}

impl LayoutConfig {
    /// Converts to the packer layout.
    pub fn pack_layout(&self) -> PackLayout {
        PackLayout::new(
            FeatureLayout::new(self.max_nodes, self.node_stride),
            FeatureLayout::new(self.max_edges, self.edge_stride),
        )
    }
}

/// Space the model consumes and produces targets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetScaling {
    /// Normal scores; predictions go through the inverse rank transform.
    #[default]
    Gaussrank,
    /// Physical units; predictions are used as they are.
    Raw,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed; epoch `e` shuffles with substream `e`.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Shuffle training batches every epoch.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

fn default_master_seed() -> u64 {
    0x5CC0_FFEE
}

fn default_shuffle() -> bool {
    true
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            shuffle: default_shuffle(),
        }
    }
}

/// Output directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving predictions and manifests. Created if missing.
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// `chrono` format of the clock stamp in output file names.
    #[serde(default = "default_clock_format")]
    pub clock_format: String,
    /// Also persist the fold's rank tables under this subdirectory.
    #[serde(default)]
    pub mapping_dir: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_clock_format() -> String {
    "%Y-%m-%d-%H-%M-%S".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            clock_format: default_clock_format(),
            mapping_dir: None,
        }
    }
}

impl RunConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SccError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|err| SccError::Config(ErrorInfo::new("config-parse", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, SccError> {
        let yaml =
            fs::read_to_string(path).map_err(|err| SccError::io("config-read", path, err))?;
        Self::from_yaml_str(&yaml).map_err(|err| err.with_context("path", path.display()))
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), SccError> {
        if self.num_folds == 0 {
            return Err(SccError::config("config-num-folds", "num_folds must be positive"));
        }
        if self.fold >= self.num_folds {
            return Err(SccError::Config(
                ErrorInfo::new("config-fold-range", "fold must be below num_folds")
                    .with_context("fold", self.fold)
                    .with_context("num_folds", self.num_folds),
            ));
        }
        if self.batch_size == 0 {
            return Err(SccError::config("config-batch-size", "batch_size must be positive"));
        }
        if self.num_output != 1 && self.num_output != 5 {
            return Err(SccError::Config(
                ErrorInfo::new("config-num-output", "num_output must be 1 or 5")
                    .with_context("num_output", self.num_output),
            ));
        }
        let layout = &self.layout;
        if layout.max_nodes == 0 || layout.node_stride == 0 {
            return Err(SccError::config("config-node-layout", "node layout must be non-empty"));
        }
        if layout.max_edges == 0 || layout.edge_stride == 0 {
            return Err(SccError::config("config-edge-layout", "edge layout must be non-empty"));
        }
        if self.loss.trim().is_empty() || self.loss.contains(['/', '\\']) {
            return Err(SccError::Config(
                ErrorInfo::new("config-loss-name", "loss name must be a plain file-name token")
                    .with_context("loss", &self.loss),
            ));
        }
        if self.pseudo_label && self.data.prior_predictions.is_none() {
            return Err(SccError::Config(
                ErrorInfo::new("config-pseudo-label", "pseudo_label needs prior predictions")
                    .with_hint("set data.prior_predictions or disable pseudo_label"),
            ));
        }
        Ok(())
    }
}
