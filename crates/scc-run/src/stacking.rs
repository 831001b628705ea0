//! Previous-stage predictions used as pseudo-labels for the test couplings.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::{info, warn};
use scc_core::{CouplingRecord, ErrorInfo, PairId, SccError};
use scc_pack::{open_table, CouplingTable};
use serde::Deserialize;

/// Prior `scalar_coupling_constant` per pair id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorPredictions {
    by_id: HashMap<PairId, f64>,
}

/// Test couplings with prior values merged in.
#[derive(Debug, Clone)]
pub struct StackOutcome {
    /// Records that found a prior, with the prior as their target.
    pub labelled: CouplingTable,
    /// Test pairs without a prior value.
    pub missing: usize,
}

#[derive(Debug, Deserialize)]
struct PriorRow {
    id: u64,
    scalar_coupling_constant: f64,
}

impl PriorPredictions {
    /// Builds from `(id, value)` pairs. Ids must be unique and values finite.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PairId, f64)>) -> Result<Self, SccError> {
        let mut by_id = HashMap::new();
        for (id, value) in pairs {
            if !value.is_finite() {
                return Err(SccError::Schema(
                    ErrorInfo::new("prior-non-finite", "prior prediction is not finite")
                        .with_context("id", id),
                ));
            }
            if by_id.insert(id, value).is_some() {
                return Err(SccError::Schema(
                    ErrorInfo::new("prior-duplicate-id", "pair id predicted twice")
                        .with_context("id", id),
                ));
            }
        }
        Ok(Self { by_id })
    }

    /// Reads `id, scalar_coupling_constant` rows; other columns are ignored.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SccError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut pairs = Vec::new();
        for row in rdr.deserialize::<PriorRow>() {
            let row =
                row.map_err(|err| SccError::Schema(ErrorInfo::new("prior-row", err.to_string())))?;
            pairs.push((PairId::from_raw(row.id), row.scalar_coupling_constant));
        }
        Self::from_pairs(pairs)
    }

    /// Reads the prediction file at `path`, usually a `.csv.gz`.
    pub fn load(path: &Path) -> Result<Self, SccError> {
        let priors =
            Self::read_csv(open_table(path)?).map_err(|err| err.with_context("path", path.display()))?;
        info!("read {} prior predictions from {}", priors.len(), path.display());
        Ok(priors)
    }

    /// Number of ids with a prior.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no prior is loaded.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Prior value of `id`.
    pub fn get(&self, id: PairId) -> Option<f64> {
        self.by_id.get(&id).copied()
    }

    /// Left-joins the priors onto `test` by id. Matched records take the
    /// prior as their target; contributions stay as read.
    pub fn apply_to(&self, test: &CouplingTable) -> StackOutcome {
        let mut missing = 0;
        let records: Vec<CouplingRecord> = test
            .records()
            .iter()
            .filter_map(|record| match self.get(record.id) {
                Some(value) => Some(CouplingRecord {
                    scalar_coupling_constant: value,
                    ..record.clone()
                }),
                None => {
                    missing += 1;
                    None
                }
            })
            .collect();
        if missing > 0 {
            warn!("{missing} test pairs have no prior prediction");
        }
        StackOutcome {
            labelled: CouplingTable::new(records, true),
            missing,
        }
    }
}
