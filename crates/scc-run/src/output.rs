//! Compressed prediction tables written at the end of a fold.

use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use scc_core::{ErrorInfo, SccError};
use scc_pack::TableSink;

use crate::reconstruct::PredictionRow;

/// Components shared by the names of a fold's output files.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNames {
    /// Wall-clock stamp of the run.
    pub clock: String,
    /// Loss name.
    pub loss: String,
    /// Validation mean log-MAE.
    pub lmae: f64,
    /// Fold index.
    pub fold: u32,
}

impl OutputNames {
    /// Stamps the current local time with a `chrono` format string.
    pub fn now(clock_format: &str, loss: &str, lmae: f64, fold: u32) -> Self {
        Self {
            clock: Local::now().format(clock_format).to_string(),
            loss: loss.to_string(),
            lmae,
            fold,
        }
    }

    fn stem(&self) -> String {
        format!("{}_{}_{:.4}_fold_{}", self.clock, self.loss, self.lmae, self.fold)
    }

    /// `cv_<clock>_<loss>_<lmae>_fold_<k>.csv.gz`
    pub fn cv_file(&self) -> String {
        format!("cv_{}.csv.gz", self.stem())
    }

    /// `sub_<clock>_<loss>_<lmae>_fold_<k>.csv.gz`
    pub fn sub_file(&self) -> String {
        format!("sub_{}.csv.gz", self.stem())
    }

    /// `run_manifest_fold_<k>.json`
    pub fn manifest_file(&self) -> String {
        format!("run_manifest_fold_{}.json", self.fold)
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> SccError + '_ {
    move |err| {
        SccError::Serde(
            ErrorInfo::new("output-write", err.to_string()).with_context("path", path.display()),
        )
    }
}

fn finish(writer: csv::Writer<TableSink>, path: &Path) -> Result<(), SccError> {
    writer
        .into_inner()
        .map_err(|err| SccError::io("output-flush", path, err.error()))?
        .finish()
        .map_err(|err| SccError::io("output-flush", path, err))
}

/// Writes validation predictions next to their targets:
/// `id, molecule_name, type, scalar_coupling_constant, target`.
pub fn write_cv(path: &Path, rows: &[PredictionRow]) -> Result<PathBuf, SccError> {
    let mut writer = csv::WriterBuilder::new().from_writer(TableSink::create(path)?);
    let err = csv_error(path);
    writer
        .write_record(["id", "molecule_name", "type", "scalar_coupling_constant", "target"])
        .map_err(&err)?;
    for row in rows {
        writer
            .write_record([
                row.id.to_string(),
                row.molecule_name.clone(),
                row.coupling_type.to_string(),
                row.scalar_coupling_constant.to_string(),
                row.target.to_string(),
            ])
            .map_err(&err)?;
    }
    finish(writer, path)?;
    info!("wrote {} validation predictions to {}", rows.len(), path.display());
    Ok(path.to_path_buf())
}

/// Writes test predictions: `id, scalar_coupling_constant`, followed by
/// `fc, sd, pso, dso` when the rows carry contributions.
pub fn write_sub(path: &Path, rows: &[PredictionRow], num_output: usize) -> Result<PathBuf, SccError> {
    let mut writer = csv::WriterBuilder::new().from_writer(TableSink::create(path)?);
    let err = csv_error(path);
    let mut header = vec!["id", "scalar_coupling_constant"];
    if num_output == 5 {
        header.extend(["fc", "sd", "pso", "dso"]);
    }
    writer.write_record(&header).map_err(&err)?;
    for row in rows {
        let mut record = vec![row.id.to_string(), row.scalar_coupling_constant.to_string()];
        if num_output == 5 {
            let contributions = row.contributions.unwrap_or_default().to_array();
            record.extend(contributions.iter().map(f64::to_string));
        }
        writer.write_record(&record).map_err(&err)?;
    }
    finish(writer, path)?;
    info!("wrote {} test predictions to {}", rows.len(), path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_the_run_convention() {
        let names = OutputNames {
            clock: "2019-08-28-10-00-00".into(),
            loss: "lmae".into(),
            lmae: -1.23456,
            fold: 3,
        };
        assert_eq!(names.cv_file(), "cv_2019-08-28-10-00-00_lmae_-1.2346_fold_3.csv.gz");
        assert_eq!(names.sub_file(), "sub_2019-08-28-10-00-00_lmae_-1.2346_fold_3.csv.gz");
        assert_eq!(names.manifest_file(), "run_manifest_fold_3.json");
    }

    #[test]
    fn clock_uses_the_given_format() {
        let names = OutputNames::now("%Y", "lmae", 0.0, 0);
        assert_eq!(names.clock.len(), 4);
        assert!(names.clock.chars().all(|c| c.is_ascii_digit()));
    }
}
