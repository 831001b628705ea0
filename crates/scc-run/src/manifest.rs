use std::fs;
use std::path::{Path, PathBuf};

use scc_core::{ErrorInfo, RunProvenance, SccError, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::metrics::LmaeReport;

/// Schema version written into new run manifests.
pub const RUN_MANIFEST_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Row counts of the frames a fold was run on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    /// Training molecules, pseudo-labelled ones included.
    pub train_molecules: usize,
    /// Validation molecules.
    pub valid_molecules: usize,
    /// Test molecules.
    pub test_molecules: usize,
    /// Training pairs, pseudo-labelled ones included.
    pub train_pairs: usize,
    /// Validation pairs.
    pub valid_pairs: usize,
    /// Test pairs.
    pub test_pairs: usize,
    /// Test pairs appended to training through prior predictions.
    pub pseudo_labelled_pairs: usize,
    /// Test pairs without a prior prediction.
    pub prior_missing: usize,
    /// Pack warnings raised across all frames.
    pub pack_warnings: usize,
}

/// Files written by a fold run, relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutputs {
    /// Validation predictions.
    pub cv: PathBuf,
    /// Test predictions.
    pub sub: PathBuf,
    /// Persisted rank tables, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_dir: Option<PathBuf>,
}

/// Structured record of one completed fold run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Layout version.
    pub schema_version: SchemaVersion,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Hash, fold, seed and timestamp of the run.
    pub provenance: RunProvenance,
    /// Model that produced the predictions.
    pub model: String,
    /// Frame sizes.
    pub counts: RowCounts,
    /// Validation scores.
    pub lmae: LmaeReport,
    /// Written files.
    pub outputs: RunOutputs,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), SccError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| SccError::io("manifest-mkdir", parent, err))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            SccError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| SccError::io("manifest-write", path, err))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, SccError> {
        let contents =
            fs::read_to_string(path).map_err(|err| SccError::io("manifest-read", path, err))?;
        serde_json::from_str(&contents).map_err(|err| {
            SccError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}
