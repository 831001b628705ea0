//! On-disk layout of a fitted [`GaussRankMap`].
//!
//! A mapping directory holds `manifest.json`, which names the fold and lists
//! one CSV file per coupling type. Type and fold come from the manifest only;
//! file names carry no meaning.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use log::info;
use scc_core::{CouplingType, ErrorInfo, RunProvenance, SccError, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::mapping::RankMapping;
use crate::transform::GaussRankMap;

/// Name of the manifest inside a mapping directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Schema version written into new manifests.
pub const MAPPING_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Manifest describing a persisted [`GaussRankMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingManifest {
    /// Layout version.
    pub schema_version: SchemaVersion,
    /// Fold the tables belong to.
    pub fold: u32,
    /// One entry per fitted type.
    pub tables: Vec<MappingEntry>,
    /// Run that produced the tables.
    #[serde(default)]
    pub provenance: RunProvenance,
}

/// Manifest entry for one coupling type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Coupling type covered by the file.
    pub coupling_type: CouplingType,
    /// CSV file relative to the mapping directory.
    pub file: String,
    /// Number of training values behind the table.
    pub observations: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct MappingRow {
    value: f64,
    quantile: f64,
    score: f64,
}

fn csv_error(code: &str, path: &Path, err: csv::Error) -> SccError {
    SccError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

/// Writes `map` into `dir`, creating it when needed.
pub fn save_map(
    map: &GaussRankMap,
    dir: &Path,
    provenance: &RunProvenance,
) -> Result<MappingManifest, SccError> {
    fs::create_dir_all(dir).map_err(|err| SccError::io("rank-save-mkdir", dir, err))?;
    let mut tables = Vec::new();
    for mapping in map.mappings() {
        let file = format!("fold_{}_type_{}.csv", map.fold(), mapping.coupling_type().index());
        let path = dir.join(&file);
        let mut writer =
            csv::Writer::from_path(&path).map_err(|err| csv_error("rank-save-open", &path, err))?;
        for ((value, quantile), score) in mapping
            .values()
            .iter()
            .zip(mapping.quantiles())
            .zip(mapping.scores())
        {
            writer
                .serialize(MappingRow {
                    value: *value,
                    quantile: *quantile,
                    score: *score,
                })
                .map_err(|err| csv_error("rank-save-row", &path, err))?;
        }
        writer
            .flush()
            .map_err(|err| SccError::io("rank-save-flush", &path, err))?;
        tables.push(MappingEntry {
            coupling_type: mapping.coupling_type(),
            file,
            observations: mapping.observations(),
        });
    }
    let manifest = MappingManifest {
        schema_version: MAPPING_SCHEMA,
        fold: map.fold(),
        tables,
        provenance: provenance.clone(),
    };
    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).map_err(|err| {
        SccError::Serde(
            ErrorInfo::new("rank-manifest-serialize", err.to_string())
                .with_context("path", manifest_path.display()),
        )
    })?;
    fs::write(&manifest_path, json)
        .map_err(|err| SccError::io("rank-manifest-write", &manifest_path, err))?;
    info!(
        "saved {} rank tables for fold {} to {}",
        manifest.tables.len(),
        manifest.fold,
        dir.display()
    );
    Ok(manifest)
}

/// Loads a map written by [`save_map`]; `expected_fold` guards against
/// pairing a fold with another fold's tables.
pub fn load_map(dir: &Path, expected_fold: Option<u32>) -> Result<GaussRankMap, SccError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let contents = fs::read_to_string(&manifest_path)
        .map_err(|err| SccError::io("rank-manifest-read", &manifest_path, err))?;
    let manifest: MappingManifest = serde_json::from_str(&contents).map_err(|err| {
        SccError::Serde(
            ErrorInfo::new("rank-manifest-parse", err.to_string())
                .with_context("path", manifest_path.display()),
        )
    })?;
    if manifest.schema_version.major != MAPPING_SCHEMA.major {
        return Err(SccError::Schema(
            ErrorInfo::new("rank-manifest-version", "unsupported mapping schema")
                .with_context("found", manifest.schema_version.major)
                .with_context("expected", MAPPING_SCHEMA.major),
        ));
    }
    if let Some(fold) = expected_fold {
        if fold != manifest.fold {
            return Err(SccError::Config(
                ErrorInfo::new("rank-fold-mismatch", "mapping directory belongs to another fold")
                    .with_context("expected", fold)
                    .with_context("found", manifest.fold)
                    .with_context("path", dir.display()),
            ));
        }
    }
    let mut seen = BTreeSet::new();
    let mut tables = Vec::with_capacity(manifest.tables.len());
    for entry in &manifest.tables {
        if !seen.insert(entry.coupling_type) {
            return Err(SccError::Schema(
                ErrorInfo::new("rank-manifest-duplicate", "coupling type listed twice")
                    .with_context("coupling_type", entry.coupling_type),
            ));
        }
        let path = dir.join(&entry.file);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|err| csv_error("rank-load-open", &path, err))?;
        let mut values = Vec::new();
        let mut quantiles = Vec::new();
        let mut scores = Vec::new();
        for row in reader.deserialize::<MappingRow>() {
            let row = row.map_err(|err| csv_error("rank-load-row", &path, err))?;
            values.push(row.value);
            quantiles.push(row.quantile);
            scores.push(row.score);
        }
        let table = RankMapping::from_parts(
            entry.coupling_type,
            entry.observations,
            values,
            quantiles,
            scores,
        )
        .map_err(|err| err.with_context("path", path.display()))?;
        tables.push(table);
    }
    GaussRankMap::from_mappings(manifest.fold, tables)
}
